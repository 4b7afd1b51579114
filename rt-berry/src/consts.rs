//! 通用常量.

/// 行/列方向余弦点积偏离 0 的最大容许值. 超出则判定几何无效.
pub const ORTHOGONAL_TOL: f64 = 1e-3;

/// 切片法向量模长偏离 1 的最大容许值. 超出则判定几何无效.
pub const UNIT_NORM_TOL: f64 = 1e-3;

/// 单切片序列的层间距哨兵值 (毫米).
///
/// 仅为保持变换矩阵可逆而存在, 不具备物理意义. 调用方不应将其用于
/// 单切片体积测量.
pub const SINGLE_SLICE_SPACING: f64 = 1.0;

/// 掩码中代表前景 (ROI 内部) 的体素值.
pub const FOREGROUND: bool = true;

/// 掩码中代表背景的体素值.
pub const BACKGROUND: bool = false;
