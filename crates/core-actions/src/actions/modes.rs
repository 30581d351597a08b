//! Visual family, command line, and search: entering, switching, leaving.

use crate::action::{Action, ActionContext, ActionError};
use core_state::Mode;

const VISUAL_FAMILY: &[Mode] = &[
    Mode::Normal,
    Mode::Visual,
    Mode::VisualLine,
    Mode::VisualBlock,
];

/// `v`, `V`, `<C-v>`: enter the visual kind from Normal, switch kinds while
/// in another visual mode, or return to Normal when pressed again.
pub struct ToggleVisual {
    name: &'static str,
    keys: &'static [&'static str],
    target: Mode,
}

impl ToggleVisual {
    pub fn charwise() -> Self {
        Self {
            name: "toggle_visual",
            keys: &["v"],
            target: Mode::Visual,
        }
    }

    pub fn linewise() -> Self {
        Self {
            name: "toggle_visual_line",
            keys: &["V"],
            target: Mode::VisualLine,
        }
    }

    pub fn blockwise() -> Self {
        Self {
            name: "toggle_visual_block",
            keys: &["<C-v>", "<C-q>"],
            target: Mode::VisualBlock,
        }
    }
}

impl Action for ToggleVisual {
    fn name(&self) -> &'static str {
        self.name
    }

    fn keys(&self) -> &[&'static str] {
        self.keys
    }

    fn modes(&self) -> &[Mode] {
        VISUAL_FAMILY
    }

    fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        let next = if ctx.state.mode() == self.target {
            Mode::Normal
        } else {
            self.target
        };
        ctx.set_mode(next);
        Ok(())
    }
}

/// `<Esc>` and friends in every mode that has nothing to undo on exit.
pub struct EscapeToNormal;

impl Action for EscapeToNormal {
    fn name(&self) -> &'static str {
        "escape_to_normal"
    }

    fn keys(&self) -> &[&'static str] {
        &["<Esc>", "<C-c>", "<C-[>"]
    }

    fn modes(&self) -> &[Mode] {
        &[
            Mode::Visual,
            Mode::VisualLine,
            Mode::VisualBlock,
            Mode::CommandLine,
            Mode::SearchInProgress,
        ]
    }

    fn exec(&self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        ctx.set_mode(Mode::Normal);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_state::VimState;
    use core_text::{Buffer, Position};

    fn press(action: &dyn Action, st: &mut VimState, b: &Buffer) {
        let pos = st.cursor();
        let mut ctx = ActionContext::new(pos, st, b, &[]);
        action.exec(&mut ctx).unwrap();
    }

    #[test]
    fn visual_toggles_switch_and_exit() {
        let b = Buffer::from_str("t", "abc").unwrap();
        let mut st = VimState::new(Position::origin());
        press(&ToggleVisual::charwise(), &mut st, &b);
        assert_eq!(st.mode(), Mode::Visual);
        press(&ToggleVisual::linewise(), &mut st, &b);
        assert_eq!(st.mode(), Mode::VisualLine);
        press(&ToggleVisual::linewise(), &mut st, &b);
        assert_eq!(st.mode(), Mode::Normal);
        press(&ToggleVisual::blockwise(), &mut st, &b);
        press(&EscapeToNormal, &mut st, &b);
        assert_eq!(st.mode(), Mode::Normal);
    }
}
