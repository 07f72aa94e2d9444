//! 存活监督状态
//!
//! 监督器的状态由主循环独占修改，通过原子版本镜像给其他线程读取。

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// 监督器状态
///
/// ```text
/// Uninitialized ──bring-up──▶ Active ◀──recovery──▶ Recovering
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SupervisorState {
    /// 尚未进行首次初始化
    #[default]
    Uninitialized = 0,
    /// 传感器正常出数
    Active = 1,
    /// 信号丢失，按固定间隔尝试恢复
    Recovering = 2,
}

impl SupervisorState {
    /// 从 u8 转换，无效值视为 Uninitialized
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Active,
            2 => Self::Recovering,
            _ => Self::Uninitialized,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_active(self) -> bool {
        self == Self::Active
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Active => "active",
            Self::Recovering => "recovering",
        };
        f.write_str(name)
    }
}

/// 监督器状态（原子版本，用于线程间共享）
#[derive(Debug, Default)]
pub struct AtomicSupervisorState {
    inner: AtomicU8,
}

impl AtomicSupervisorState {
    pub fn new(state: SupervisorState) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    pub fn get(&self, ordering: Ordering) -> SupervisorState {
        SupervisorState::from_u8(self.inner.load(ordering))
    }

    pub fn set(&self, state: SupervisorState, ordering: Ordering) {
        self.inner.store(state.as_u8(), ordering);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_conversions() {
        for state in [
            SupervisorState::Uninitialized,
            SupervisorState::Active,
            SupervisorState::Recovering,
        ] {
            assert_eq!(SupervisorState::from_u8(state.as_u8()), state);
        }
        assert_eq!(SupervisorState::from_u8(200), SupervisorState::Uninitialized);
        assert!(SupervisorState::Active.is_active());
        assert!(!SupervisorState::Recovering.is_active());
    }

    #[test]
    fn test_atomic_state() {
        let state = AtomicSupervisorState::default();
        assert_eq!(state.get(Ordering::Relaxed), SupervisorState::Uninitialized);

        state.set(SupervisorState::Recovering, Ordering::Relaxed);
        assert_eq!(state.get(Ordering::Relaxed), SupervisorState::Recovering);
    }

    #[test]
    fn test_display() {
        assert_eq!(SupervisorState::Active.to_string(), "active");
        assert_eq!(SupervisorState::Recovering.to_string(), "recovering");
    }
}
