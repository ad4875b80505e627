//! 姿态换算
//!
//! 四元数约定：`[q1, q2, q3, q4] = [w, x, y, z]`，机体系到 NED 系。
//! 欧拉角单位为度，顺序为 roll / pitch / yaw（Z-Y-X）。

/// 欧拉角（度）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rpy {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

/// 四元数 → 欧拉角（度）
///
/// 不要求输入已归一化；pitch 的 `asin` 参数会钳位到 [-1, 1]，避免数值误差产生 NaN。
pub fn quaternion_to_rpy(q: [f32; 4]) -> Rpy {
    let [q0, q1, q2, q3] = q;
    let qs = q0 * q0;
    let qx = q1 * q1;
    let qy = q2 * q2;
    let qz = q3 * q3;

    let r11 = qs + qx - qy - qz;
    let r12 = 2.0 * (q1 * q2 + q0 * q3);
    let r13 = 2.0 * (q1 * q3 - q0 * q2);
    let r23 = 2.0 * (q2 * q3 + q0 * q1);
    let r33 = qs - qx - qy + qz;

    Rpy {
        roll: r23.atan2(r33).to_degrees(),
        pitch: (-r13).clamp(-1.0, 1.0).asin().to_degrees(),
        yaw: r12.atan2(r11).to_degrees(),
    }
}

/// 将航向角折叠到 [0, 360)
///
/// 负值加 360。`atan2` 的结果落在 [-180, 180]，一次修正即可；
/// 但 f32 下极小的负值加 360 会舍入成 360.0，这种情况归零。
pub fn wrap_yaw(yaw: f32) -> f32 {
    let wrapped = if yaw < 0.0 { yaw + 360.0 } else { yaw };
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}
