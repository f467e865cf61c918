use std::fmt;

use shared::domain::{Mine, Rover};

/// Titled flat list, one line per entity, in the order the service returned them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryView {
    title: &'static str,
    lines: Vec<String>,
}

impl RegistryView {
    pub const MINES_TITLE: &'static str = "🧾 Existing Mines";
    pub const ROVERS_TITLE: &'static str = "🧾 Rover Fleet";

    pub fn mines(mines: &[Mine]) -> Self {
        Self {
            title: Self::MINES_TITLE,
            lines: mines
                .iter()
                .map(|mine| format!("💣 ID: {} (row {}, col {})", mine.id, mine.row, mine.col))
                .collect(),
        }
    }

    pub fn rovers(rovers: &[Rover]) -> Self {
        Self {
            title: Self::ROVERS_TITLE,
            lines: rovers
                .iter()
                .map(|rover| format!("🤖 ID: {} status: {}", rover.id, rover.status))
                .collect(),
        }
    }

    pub fn empty_mines() -> Self {
        Self::mines(&[])
    }

    pub fn empty_rovers() -> Self {
        Self::rovers(&[])
    }

    pub fn title(&self) -> &str {
        self.title
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl fmt::Display for RegistryView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        for line in &self.lines {
            writeln!(f, "  {line}")?;
        }
        Ok(())
    }
}
