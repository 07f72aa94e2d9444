//! 航向解缠
//!
//! IMU 输出的航向被限制在 (-180°, 180°]，机器人连续转圈时会在 ±180° 处跳变。
//! [`AngleUnwrapper`] 相对首个采样建立零点，每次只累加最短路径增量，
//! 从而得到可以无限增长的连续航向。

use yawlink_protocol::OrientationSample;

/// 将角度映射到 `[-180, 180)`
///
/// 对区间内的值原样返回，因此 `wrap180(wrap180(a)) == wrap180(a)`。
/// 非有限值原样返回（调用方负责过滤）。
pub fn wrap180(angle: f64) -> f64 {
    if !angle.is_finite() || (-180.0..180.0).contains(&angle) {
        return angle;
    }
    let mut wrapped = (angle + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid 在浮点舍入下可能返回恰好 360
    if wrapped >= 180.0 {
        wrapped -= 360.0;
    }
    if wrapped < -180.0 {
        wrapped += 360.0;
    }
    wrapped
}

/// 解缠状态
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct YawState {
    /// 最近一次原始航向（度）
    pub raw_yaw_deg: f64,
    /// 零点（首个采样的原始航向）
    pub reference_offset_deg: f64,
    /// 最近一次相对零点的航向，始终在 `[-180, 180)`
    pub last_wrapped_yaw_deg: f64,
    /// 累计航向，无界
    pub accumulated_yaw_deg: f64,
    /// 是否已建立零点
    pub reference_is_set: bool,
}

/// 连续航向解缠器
#[derive(Debug, Clone, Default)]
pub struct AngleUnwrapper {
    state: YawState,
    /// 自零点建立以来接受的采样数
    samples_since_reference: u64,
}

impl AngleUnwrapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// 输入一个姿态采样
    ///
    /// 非有限四元数被忽略，返回 `false`，状态不变。
    pub fn update(&mut self, sample: OrientationSample) -> bool {
        if !sample.is_finite() {
            return false;
        }
        self.update_raw(f64::from(sample.yaw_deg()))
    }

    /// 输入一个原始航向（度）
    pub fn update_raw(&mut self, raw_yaw_deg: f64) -> bool {
        if !raw_yaw_deg.is_finite() {
            return false;
        }
        let state = &mut self.state;
        state.raw_yaw_deg = raw_yaw_deg;

        if !state.reference_is_set {
            state.reference_offset_deg = raw_yaw_deg;
            state.reference_is_set = true;
            state.last_wrapped_yaw_deg = 0.0;
            state.accumulated_yaw_deg = 0.0;
            self.samples_since_reference = 1;
            return true;
        }

        let wrapped = wrap180(raw_yaw_deg - state.reference_offset_deg);
        let delta = wrap180(wrapped - state.last_wrapped_yaw_deg);
        state.accumulated_yaw_deg += delta;
        state.last_wrapped_yaw_deg = wrapped;
        self.samples_since_reference += 1;
        true
    }

    /// 重置零点：下一个采样成为新的零点，累计航向归零
    pub fn rezero(&mut self) {
        let raw = self.state.raw_yaw_deg;
        self.state = YawState {
            raw_yaw_deg: raw,
            ..YawState::default()
        };
        self.samples_since_reference = 0;
    }

    /// 传感器重新初始化后的复位，语义与 [`rezero`](Self::rezero) 相同
    pub fn reset(&mut self) {
        self.rezero();
    }

    pub fn state(&self) -> &YawState {
        &self.state
    }

    pub fn accumulated_yaw_deg(&self) -> f64 {
        self.state.accumulated_yaw_deg
    }

    pub fn is_reference_set(&self) -> bool {
        self.state.reference_is_set
    }

    pub fn samples_since_reference(&self) -> u64 {
        self.samples_since_reference
    }
}
