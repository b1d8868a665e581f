use std::fmt;

use crate::models::player::SessionId;
use crate::services::movement::Bounds;
use crate::services::store::Players;

const SIDEBAR_WIDTH: i32 = 200;
const LINE_HEIGHT: i32 = 20;

/// Draws the board for `players` as an SVG document: the canvas with one box
/// per player, and a sidebar listing each player with its coordinates. The
/// box belonging to `local` gets a heavy outline.
pub fn render_board(players: &Players, local: Option<SessionId>, bounds: &Bounds) -> String {
    Board { players, local, bounds }.to_string()
}

struct Board<'a> {
    players: &'a Players,
    local: Option<SessionId>,
    bounds: &'a Bounds,
}

impl fmt::Display for Board<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Board { players, local, bounds } = self;
        let total_width = bounds.width.saturating_add(SIDEBAR_WIDTH);
        writeln!(
            f,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{total_width}" height="{h}" viewBox="0 0 {total_width} {h}">"#,
            h = bounds.height,
        )?;
        writeln!(
            f,
            r##"<rect class="canvas" x="0" y="0" width="{}" height="{}" fill="#f4f4f4" stroke="#999"/>"##,
            bounds.width, bounds.height,
        )?;

        for (id, record) in players.iter() {
            let is_local = *local == Some(*id);
            let outline = if is_local {
                r##" stroke="#000" stroke-width="3""##
            } else {
                ""
            };
            writeln!(
                f,
                r#"<rect class="{class}" data-id="{id}" x="{x}" y="{y}" width="{s}" height="{s}" fill="{fill}"{outline}/>"#,
                class = if is_local { "player local" } else { "player" },
                x = record.x,
                y = record.y,
                s = bounds.box_size,
                fill = Escaped(&record.color),
            )?;
        }

        writeln!(f, r#"<g class="sidebar" transform="translate({} 0)">"#, bounds.width)?;
        writeln!(f, r#"<text x="10" y="{LINE_HEIGHT}" font-weight="bold">Players ({})</text>"#, players.len())?;
        for (row, (id, record)) in players.iter().enumerate() {
            let y = LINE_HEIGHT.saturating_mul(row as i32 + 2);
            let marker = if *local == Some(*id) { " (you)" } else { "" };
            writeln!(
                f,
                r#"<text x="10" y="{y}" fill="{fill}">{label}{marker} ({x}, {py})</text>"#,
                fill = Escaped(&record.color),
                label = Escaped(&record.label(id)),
                x = record.x,
                py = record.y,
            )?;
        }
        writeln!(f, "</g>\n</svg>")
    }
}

/// XML-escapes text as it is written.
struct Escaped<'a>(&'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            match c {
                '&' => f.write_str("&amp;")?,
                '<' => f.write_str("&lt;")?,
                '>' => f.write_str("&gt;")?,
                '"' => f.write_str("&quot;")?,
                '\'' => f.write_str("&#39;")?,
                _ => write!(f, "{c}")?,
            }
        }
        Ok(())
    }
}
