//! 切片几何解析.
//!
//! 从切片方向元数据推导行/列/法向单位方向, 校验正交性, 并计算切片
//! 位置与层间距. 所有下游坐标变换都建立在这里的校验之上.

pub mod transform;

pub use transform::PatientTransform;

use itertools::izip;

use crate::consts::{ORTHOGONAL_TOL, SINGLE_SLICE_SPACING, UNIT_NORM_TOL};
use crate::{ConvertError, ConvertResult, Series, SeriesSlice, Vec3};

/// 一张切片的三个方向.
#[derive(Debug, Clone, Copy)]
pub struct SliceDirections {
    /// 行方向余弦.
    pub row: Vec3,

    /// 列方向余弦.
    pub col: Vec3,

    /// 切片法向, 为行/列方向的叉积.
    pub normal: Vec3,
}

#[inline]
pub(crate) fn dot3(a: &Vec3, b: &Vec3) -> f64 {
    izip!(a, b).map(|(x, y)| x * y).sum()
}

#[inline]
fn cross3(a: &Vec3, b: &Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// 解析切片的行/列/法向方向.
///
/// 当行/列方向点积偏离 0 超过 [`ORTHOGONAL_TOL`], 或法向量模长偏离 1
/// 超过 [`UNIT_NORM_TOL`] 时, 返回 [`ConvertError::InvalidGeometry`]
/// 并携带该切片的 SOP UID. 该检查挡住了会悄悄污染全部下游计算的
/// 畸形或非轴向堆叠输入.
pub fn slice_directions(slice: &SeriesSlice) -> ConvertResult<SliceDirections> {
    let row = slice.row_direction();
    let col = slice.col_direction();
    let normal = cross3(&row, &col);

    if dot3(&row, &col).abs() > ORTHOGONAL_TOL
        || (dot3(&normal, &normal).sqrt() - 1.0).abs() > UNIT_NORM_TOL
    {
        return Err(ConvertError::InvalidGeometry(slice.sop_uid().to_owned()));
    }
    Ok(SliceDirections { row, col, normal })
}

/// 切片位置: 切片原点在法向上的投影.
pub fn slice_position(slice: &SeriesSlice) -> ConvertResult<f64> {
    let dirs = slice_directions(slice)?;
    Ok(dot3(&dirs.normal, &slice.position()))
}

/// 相邻切片间距, 单位毫米, 有符号.
///
/// 对至少两张切片的序列, 取首末切片位置之差除以 `(切片数 - 1)`.
/// 该值假定层距均匀, 符号编码堆叠方向. 单切片序列返回哨兵值
/// [`SINGLE_SLICE_SPACING`], 仅为保持变换可逆, 无物理意义.
pub fn spacing_between_slices(series: &Series) -> ConvertResult<f64> {
    if series.len() > 1 {
        let first = slice_position(series.first())?;
        // 序列非空由构造保证.
        let last = slice_position(series.slices().last().unwrap())?;
        return Ok((last - first) / (series.len() - 1) as f64);
    }
    Ok(SINGLE_SLICE_SPACING)
}
