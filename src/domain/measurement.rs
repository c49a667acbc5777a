/// Distance reading reduced from all distance fields of a single line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Arithmetic mean in millimetres
    pub mean_mm: f64,
    /// Number of distance fields the mean was taken over
    pub count: usize,
}

impl Measurement {
    /// Average the distances found in one line, `None` when there were none
    pub fn aggregate(distances_mm: &[u64]) -> Option<Self> {
        if distances_mm.is_empty() {
            return None;
        }

        let sum: f64 = distances_mm.iter().map(|&d| d as f64).sum();
        Some(Self {
            mean_mm: sum / distances_mm.len() as f64,
            count: distances_mm.len(),
        })
    }

    /// Text typed into the focused application.
    ///
    /// Whole numbers keep one decimal place (`100.0`), anything else uses the
    /// shortest representation that round-trips (`1234.5`).
    pub fn as_text(&self) -> String {
        if self.mean_mm.fract() == 0.0 && self.mean_mm.abs() < 1e16 {
            format!("{:.1}", self.mean_mm)
        } else {
            format!("{}", self.mean_mm)
        }
    }

    /// `val=…` for a single reading, `avg(n)=…` when several were averaged
    pub fn label(&self) -> String {
        if self.count > 1 {
            format!("avg({})={}", self.count, self.as_text())
        } else {
            format!("val={}", self.as_text())
        }
    }
}
