use crate::backtracking_search::{Assignment, Choice};
use crate::grid_config::GridConfig;

/// Character drawn for blocked cells.
pub const BLOCK: char = '█';

/// Place each assigned word into its cells. Cells that are blocked or not covered by any filled
/// slot are `None`.
pub fn letter_grid(config: &GridConfig, assignment: &Assignment) -> Vec<Vec<Option<char>>> {
    let mut letters: Vec<Vec<Option<char>>> = vec![vec![None; config.width()]; config.height()];

    for Choice { slot_id, word_id } in assignment.choices() {
        let slot = config.slot(slot_id);
        let word = config.word(word_id);

        for ((row, col), &glyph) in slot.cell_coords().zip(word.glyphs.iter()) {
            letters[row][col] = Some(glyph);
        }
    }

    letters
}

/// Turn the given grid config and assignment into a rendered string, one line per row.
pub fn render_grid(config: &GridConfig, assignment: &Assignment) -> String {
    let letters = letter_grid(config, assignment);

    letters
        .iter()
        .enumerate()
        .map(|(row, cells)| {
            cells
                .iter()
                .enumerate()
                .map(|(col, &letter)| {
                    if config.is_open(row, col) {
                        letter.unwrap_or(' ')
                    } else {
                        BLOCK
                    }
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}
