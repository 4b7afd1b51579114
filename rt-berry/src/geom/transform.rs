//! 像素坐标与患者坐标之间的 4x4 仿射变换.

use ndarray::{s, Array2, ArrayView2};

use super::{dot3, slice_directions, spacing_between_slices};
use crate::{ConvertResult, Series};

/// 像素坐标 `(行, 列, 层)` 与患者坐标 `(x, y, z)` 之间的仿射变换.
///
/// 以 4x4 齐次矩阵表示 (3x3 线性部分加平移列). 每次转换开始时按
/// 参考切片构建一次, 此后不可变; 序列几何在一次转换期间不会变化.
#[derive(Debug, Clone)]
pub struct PatientTransform {
    mat: Array2<f64>,
}

impl PatientTransform {
    /// 构建正向 (像素 -> 患者) 变换.
    ///
    /// 线性部分的三列依次为行方向乘行间距, 列方向乘列间距, 法向乘
    /// 层间距; 平移列为参考切片的患者坐标原点. 参考切片几何校验失败
    /// 时返回 [`crate::ConvertError::InvalidGeometry`].
    pub fn forward(series: &Series) -> ConvertResult<Self> {
        let first = series.first();
        let dirs = slice_directions(first)?;
        let spacing = spacing_between_slices(series)?;
        let (row_mm, col_mm) = first.pixel_spacing();
        let origin = first.position();

        let mut mat = Array2::<f64>::eye(4);
        for i in 0..3 {
            mat[[i, 0]] = dirs.row[i] * row_mm;
            mat[[i, 1]] = dirs.col[i] * col_mm;
            mat[[i, 2]] = dirs.normal[i] * spacing;
            mat[[i, 3]] = origin[i];
        }
        Ok(Self { mat })
    }

    /// 构建逆向 (患者 -> 像素) 变换.
    ///
    /// 线性部分的三列是正交方向乘各自间距, 因此逆矩阵无需数值求逆,
    /// 可按行直接写出: 每行为方向向量除以对应间距, 平移列为
    /// `-linear · origin`.
    pub fn inverse(series: &Series) -> ConvertResult<Self> {
        let first = series.first();
        let dirs = slice_directions(first)?;
        let spacing = spacing_between_slices(series)?;
        let (row_mm, col_mm) = first.pixel_spacing();
        let origin = first.position();

        let axes = [
            (dirs.row, row_mm),
            (dirs.col, col_mm),
            (dirs.normal, spacing),
        ];
        let mut mat = Array2::<f64>::eye(4);
        for (i, (dir, mm)) in axes.iter().enumerate() {
            for j in 0..3 {
                mat[[i, j]] = dir[j] / mm;
            }
            mat[[i, 3]] = -dot3(dir, &origin) / mm;
        }
        Ok(Self { mat })
    }

    /// 将变换应用到一批三维点上.
    ///
    /// `points` 形状为 `(N, 3)`. 每个点补 1 为齐次坐标, 右乘矩阵
    /// 转置, 再丢弃齐次分量, 返回 `(N, 3)` 的变换结果. 纯函数,
    /// 无副作用.
    pub fn apply(&self, points: ArrayView2<f64>) -> Array2<f64> {
        let n = points.nrows();
        let mut aug = Array2::<f64>::ones((n, 4));
        aug.slice_mut(s![.., ..3]).assign(&points);
        let out = aug.dot(&self.mat.t());
        out.slice(s![.., ..3]).to_owned()
    }

    /// 获得底层 4x4 矩阵的一份不可变 shallow copy.
    #[inline]
    pub fn matrix(&self) -> ArrayView2<f64> {
        self.mat.view()
    }
}
