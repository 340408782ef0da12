use serde::{Deserialize, Serialize};

/// One side's resources during a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fighter {
    pub hp: u32,
    pub stamina: u32,
}

impl Fighter {
    pub fn is_down(&self) -> bool {
        self.hp == 0
    }
}
