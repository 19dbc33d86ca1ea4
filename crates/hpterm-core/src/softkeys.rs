//! Soft-key label banks.
//!
//! Two rows of eight labels per bank: row 0 (top) is reached with shift,
//! row 1 (bottom) without. The terminal shows either the system ("mode")
//! bank or the user bank.

/// Keys per row.
pub const KEYS_PER_ROW: usize = 8;
/// Maximum label length.
pub const LABEL_LEN: usize = 8;

/// Label row selected by the shift modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRow {
    Top = 0,
    Bottom = 1,
}

impl KeyRow {
    #[must_use]
    pub fn for_shift(shift: bool) -> Self {
        if shift { Self::Top } else { Self::Bottom }
    }
}

/// Which bank is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyBank {
    #[default]
    Mode,
    User,
}

impl KeyBank {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Mode => Self::User,
            Self::User => Self::Mode,
        }
    }
}

/// Sixteen labels.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SoftKeys {
    labels: [String; 2 * KEYS_PER_ROW],
}

impl SoftKeys {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Label at `row`, `col` (0..8). Out of range yields an empty label.
    #[must_use]
    pub fn label(&self, row: KeyRow, col: usize) -> &str {
        self.slot(row, col)
            .and_then(|idx| self.labels.get(idx))
            .map_or("", String::as_str)
    }

    /// Store up to [`LABEL_LEN`] characters of `text`.
    pub fn set_label(&mut self, row: KeyRow, col: usize, text: &str) {
        if let Some(idx) = self.slot(row, col) {
            self.labels[idx] = text.chars().take(LABEL_LEN).collect();
        }
    }

    pub fn clear(&mut self) {
        for label in &mut self.labels {
            label.clear();
        }
    }

    fn slot(&self, row: KeyRow, col: usize) -> Option<usize> {
        (col < KEYS_PER_ROW).then_some(col + row as usize * KEYS_PER_ROW)
    }
}

/// Both banks plus the selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftKeyBanks {
    system: SoftKeys,
    user: SoftKeys,
    active: KeyBank,
}

impl Default for SoftKeyBanks {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftKeyBanks {
    /// Factory labels: `Config`/`Keys` on F8 of the system bank, `f1`..`f8`
    /// on the top row of the user bank.
    #[must_use]
    pub fn new() -> Self {
        let mut system = SoftKeys::new();
        system.set_label(KeyRow::Top, 7, " Config");
        system.set_label(KeyRow::Bottom, 7, "  Keys");

        let mut user = SoftKeys::new();
        for col in 0..KEYS_PER_ROW {
            user.set_label(KeyRow::Top, col, &format!("   f{}", col + 1));
        }

        Self {
            system,
            user,
            active: KeyBank::Mode,
        }
    }

    #[must_use]
    pub fn active(&self) -> KeyBank {
        self.active
    }

    pub fn select(&mut self, bank: KeyBank) {
        self.active = bank;
    }

    pub fn toggle(&mut self) {
        self.active = self.active.toggled();
    }

    /// Label of the shown bank.
    #[must_use]
    pub fn label(&self, row: KeyRow, col: usize) -> &str {
        self.bank(self.active).label(row, col)
    }

    #[must_use]
    pub fn bank(&self, bank: KeyBank) -> &SoftKeys {
        match bank {
            KeyBank::Mode => &self.system,
            KeyBank::User => &self.user,
        }
    }

    pub fn bank_mut(&mut self, bank: KeyBank) -> &mut SoftKeys {
        match bank {
            KeyBank::Mode => &mut self.system,
            KeyBank::User => &mut self.user,
        }
    }
}
