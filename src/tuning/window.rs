/// Contiguous run of passing codes tracked during a sweep.
///
/// A window only becomes usable once it spans at least two codes; a single
/// passing code leaves it `Open`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanWindow {
    #[default]
    Unset,
    Open { min: u16 },
    Spanning { min: u16, max: u16 },
}

impl ScanWindow {
    /// Records a passing probe at `code`.
    pub fn pass(self, code: u16) -> Self {
        match self {
            ScanWindow::Unset => ScanWindow::Open { min: code },
            ScanWindow::Open { min } | ScanWindow::Spanning { min, .. } => {
                ScanWindow::Spanning { min, max: code }
            }
        }
    }

    pub fn bounds(&self) -> Option<(u16, u16)> {
        match *self {
            ScanWindow::Spanning { min, max } => Some((min, max)),
            _ => None,
        }
    }

    pub fn width(&self) -> Option<u16> {
        self.bounds().map(|(min, max)| max - min)
    }

    pub fn midpoint(&self) -> Option<u16> {
        self.bounds().map(|(min, max)| min + (max - min) / 2)
    }
}
