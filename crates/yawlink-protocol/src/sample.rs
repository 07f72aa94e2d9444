//! IMU 姿态采样

use nalgebra::Quaternion;

/// 单位四元数姿态采样 (w, x, y, z)
///
/// 由 IMU 的游戏旋转向量报告产生（陀螺仪 + 加速度计，不含磁力计），
/// 消费后即丢弃，不做保留。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrientationSample {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl OrientationSample {
    pub fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    /// 绕竖直轴旋转 `yaw_deg` 度的纯航向姿态
    pub fn from_yaw_deg(yaw_deg: f32) -> Self {
        let half = yaw_deg.to_radians() / 2.0;
        Self {
            w: half.cos(),
            x: 0.0,
            y: 0.0,
            z: half.sin(),
        }
    }

    /// 四个分量是否均为有限值
    pub fn is_finite(&self) -> bool {
        self.w.is_finite() && self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// 航向角（度），范围 (-180, 180]
    ///
    /// `atan2(2(wz + xy), 1 - 2(y² + z²))`
    pub fn yaw_deg(&self) -> f32 {
        let s = 2.0 * (self.w * self.z + self.x * self.y);
        let c = 1.0 - 2.0 * (self.y * self.y + self.z * self.z);
        s.atan2(c).to_degrees()
    }
}

impl From<Quaternion<f32>> for OrientationSample {
    fn from(q: Quaternion<f32>) -> Self {
        Self {
            w: q.w,
            x: q.i,
            y: q.j,
            z: q.k,
        }
    }
}
