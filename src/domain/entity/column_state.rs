use std::fmt;

/// ColumnState は物理スキーマとレジストリの両側からカラムを分類した結果。
/// 変更系のカラム操作はすべてこの分類から始まり、再実行しても Synced に収束する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnState {
    /// 物理・レジストリの両方に存在する。
    Synced,
    /// 物理的にのみ存在する。DDL を省略して採用し、失敗しても DROP しない。
    Orphan,
    /// レジストリにのみ存在する。削除時は DDL を省略してレジストリ行だけを消す。
    Ghost,
    /// どちらにも存在しない。
    Absent,
}

impl ColumnState {
    pub fn classify(physically_exists: bool, registered: bool) -> Self {
        match (physically_exists, registered) {
            (true, true) => Self::Synced,
            (true, false) => Self::Orphan,
            (false, true) => Self::Ghost,
            (false, false) => Self::Absent,
        }
    }

    pub fn physically_exists(&self) -> bool {
        matches!(self, Self::Synced | Self::Orphan)
    }

    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Synced | Self::Ghost)
    }
}

impl fmt::Display for ColumnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Synced => write!(f, "synced"),
            Self::Orphan => write!(f, "orphan"),
            Self::Ghost => write!(f, "ghost"),
            Self::Absent => write!(f, "absent"),
        }
    }
}
