//! A plain-text front-end.
use engine::frontend::Frontend;
use engine::info::Telemetry;
use engine::rules::{Outcome, Side};

pub struct Terminal {
    fen: Option<String>,
    orientation: Side,
    markers: Vec<String>,
    show_debug: bool,
}

impl Terminal {
    pub fn new(show_debug: bool) -> Self {
        Self {
            fen: None,
            orientation: Side::White,
            markers: Vec::new(),
            show_debug,
        }
    }

    pub fn show_board(&self) {
        if let Some(fen) = &self.fen {
            println!("{}", render(fen, self.orientation, &self.markers));
        }
    }
}

impl Frontend for Terminal {
    fn set_position(&mut self, fen: &str) {
        self.fen = Some(fen.to_string());
        self.show_board();
    }

    fn alert(&mut self, message: &str) {
        println!("!! {}", message);
        println!("!! start a new game with `new`, or `swap` to another engine");
    }

    fn set_orientation(&mut self, side: Side) {
        self.orientation = side;
    }

    fn add_marker(&mut self, square: &str) {
        self.markers.push(square.to_string());
    }

    fn clear_markers(&mut self) {
        self.markers.clear();
    }

    fn engine_identified(&mut self, name: &str) {
        println!("playing against {}", name);
    }

    fn telemetry(&mut self, telemetry: &Telemetry) {
        println!("   {}", telemetry);
    }

    fn debug(&mut self, text: &str) {
        if self.show_debug {
            for line in text.lines().filter(|l| !l.is_empty()) {
                println!("   | {}", line);
            }
        }
    }

    fn game_over(&mut self, outcome: Outcome) {
        println!("game over: {} ({})", outcome, outcome.result());
    }
}

/// Draw the piece placement of `fen` as seen from `orientation`. Squares in
/// `markers` are flagged with `*`.
pub fn render(fen: &str, orientation: Side, markers: &[String]) -> String {
    let placement = fen.split_whitespace().next().unwrap_or("");

    // grid[0] is the eighth rank, grid[r][0] the a-file.
    let mut grid = [['.'; 8]; 8];
    for (row, rank) in placement.split('/').take(8).enumerate() {
        let mut file = 0;
        for c in rank.chars() {
            match c.to_digit(10) {
                Some(skip) => file += skip as usize,
                None if file < 8 => {
                    grid[row][file] = c;
                    file += 1;
                }
                None => {}
            }
        }
    }

    let marked = |row: usize, file: usize| {
        let name = format!("{}{}", (b'a' + file as u8) as char, 8 - row);
        markers.iter().any(|m| *m == name)
    };

    let mut rows: Vec<usize> = (0..8).collect();
    let mut files: Vec<usize> = (0..8).collect();
    if orientation == Side::Black {
        rows.reverse();
        files.reverse();
    }

    let mut out = String::new();
    for &row in &rows {
        out.push_str(&format!("{} ", 8 - row));
        for &file in &files {
            out.push(if marked(row, file) { '*' } else { ' ' });
            out.push(grid[row][file]);
        }
        out.push('\n');
    }

    out.push_str("  ");
    for &file in &files {
        out.push(' ');
        out.push((b'a' + file as u8) as char);
    }

    out
}
