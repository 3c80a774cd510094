use crate::counter::Counts;
use std::io::{self, Write};

/// Renders the final two-line report.
#[derive(Debug, Default)]
pub struct Reporter;

impl Reporter {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, counts: &Counts) -> String {
        format!("Tagged {}\nTotal {}\n", counts.tagged, counts.total)
    }

    pub fn write_report<W: Write>(&self, counts: &Counts, out: &mut W) -> io::Result<()> {
        out.write_all(self.render(counts).as_bytes())?;
        out.flush()
    }
}
