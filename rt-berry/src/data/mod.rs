//! 切片元数据与序列.

use ordered_float::NotNan;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{geom, ConvertError, ConvertResult, Idx2d, Idx3d, Vec3};

mod mask;

pub use mask::{CompactRoiMask, RoiData, RoiMask};

/// 一张 2D 图像平面的几何元数据.
///
/// 像素数据本身不在本 crate 的职责范围内, 这里只保留几何转换所需的
/// 属性与用于关联轮廓的唯一标识.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct SeriesSlice {
    sop_uid: String,
    rows: usize,
    cols: usize,
    pixel_spacing: (f64, f64),
    position: Vec3,
    orientation: [f64; 6],
}

impl SeriesSlice {
    /// 直接初始化.
    ///
    /// `pixel_spacing` 按 `(行间距, 列间距)` 给出, 单位毫米, 均应为正.
    /// `orientation` 为 DICOM Image Orientation (Patient) 六元组:
    /// 前三个分量是行方向余弦, 后三个是列方向余弦.
    /// `position` 是像素 `(0, 0)` 在患者坐标系中的位置.
    pub fn new(
        sop_uid: impl Into<String>,
        rows: usize,
        cols: usize,
        pixel_spacing: (f64, f64),
        position: Vec3,
        orientation: [f64; 6],
    ) -> Self {
        Self {
            sop_uid: sop_uid.into(),
            rows,
            cols,
            pixel_spacing,
            position,
            orientation,
        }
    }

    /// 切片的 SOP Instance UID.
    #[inline]
    pub fn sop_uid(&self) -> &str {
        &self.sop_uid
    }

    /// 行数.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// 列数.
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// 像素间距 `(行间距, 列间距)`, 单位毫米.
    #[inline]
    pub fn pixel_spacing(&self) -> (f64, f64) {
        self.pixel_spacing
    }

    /// 像素 `(0, 0)` 的患者坐标.
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// 方向六元组原始值.
    #[inline]
    pub fn orientation(&self) -> [f64; 6] {
        self.orientation
    }

    /// 行方向余弦.
    #[inline]
    pub fn row_direction(&self) -> Vec3 {
        let [a, b, c, ..] = self.orientation;
        [a, b, c]
    }

    /// 列方向余弦.
    #[inline]
    pub fn col_direction(&self) -> Vec3 {
        let [.., d, e, f] = self.orientation;
        [d, e, f]
    }
}

/// 按法向投影升序排序的切片序列.
///
/// 序列中的所有切片被假定共享方向与像素间距, 且至少包含一张切片;
/// 后者由构造保证.
#[derive(Debug, Clone)]
pub struct Series {
    slices: Vec<SeriesSlice>,
}

impl Series {
    /// 构造序列, 并按切片位置 (原点在法向上的投影) 升序排序.
    ///
    /// 空输入返回 [`ConvertError::NoImagesFound`]; 任一切片方向校验
    /// 失败, 或位置投影出现非有限值, 返回
    /// [`ConvertError::InvalidGeometry`] 并携带该切片的 SOP UID.
    pub fn new(slices: Vec<SeriesSlice>) -> ConvertResult<Self> {
        if slices.is_empty() {
            return Err(ConvertError::NoImagesFound);
        }
        let mut keyed = Vec::with_capacity(slices.len());
        for slice in slices {
            let pos = geom::slice_position(&slice)?;
            let key = NotNan::new(pos)
                .map_err(|_| ConvertError::InvalidGeometry(slice.sop_uid().to_owned()))?;
            keyed.push((key, slice));
        }
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(Self {
            slices: keyed.into_iter().map(|(_, s)| s).collect(),
        })
    }

    /// 切片个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.slices.len()
    }

    /// 序列是否为空. 由构造保证恒为 `false`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// 参考切片 (序列中的第一张).
    #[inline]
    pub fn first(&self) -> &SeriesSlice {
        &self.slices[0]
    }

    /// 第 `k` 张切片. 越界时 panic.
    #[inline]
    pub fn get(&self, k: usize) -> &SeriesSlice {
        &self.slices[k]
    }

    /// 全部切片.
    #[inline]
    pub fn slices(&self) -> &[SeriesSlice] {
        &self.slices
    }

    /// 按序迭代切片.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &SeriesSlice> {
        self.slices.iter()
    }

    /// 切片平面形状 `(列数, 行数)`, 取自参考切片.
    #[inline]
    pub fn plane_shape(&self) -> Idx2d {
        (self.first().cols(), self.first().rows())
    }

    /// 与该序列对齐的掩码形状 `(列数, 行数, 切片数)`.
    #[inline]
    pub fn mask_shape(&self) -> Idx3d {
        let (c, r) = self.plane_shape();
        (c, r, self.len())
    }
}

/// 一条输入轮廓: 所属切片标识与展平的患者坐标表.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct ContourItem {
    /// 轮廓所引用切片的 SOP Instance UID.
    pub referenced_uid: String,

    /// 展平的患者坐标 `(x1, y1, z1, x2, ...)`, 长度为 3 的倍数.
    pub data: Vec<f64>,
}

impl ContourItem {
    /// 直接初始化.
    #[inline]
    pub fn new(referenced_uid: impl Into<String>, data: Vec<f64>) -> Self {
        Self {
            referenced_uid: referenced_uid.into(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Series, SeriesSlice};
    use crate::ConvertError;

    /// 以单位方向, z 轴堆叠构造测试切片.
    fn axial_slice(uid: &str, z: f64) -> SeriesSlice {
        SeriesSlice::new(
            uid,
            4,
            4,
            (1.0, 1.0),
            [0.0, 0.0, z],
            [1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        )
    }

    #[test]
    fn test_series_sorts_by_normal_projection() {
        let series = Series::new(vec![
            axial_slice("c", 4.0),
            axial_slice("a", 0.0),
            axial_slice("b", 2.0),
        ])
        .unwrap();
        let uids: Vec<&str> = series.iter().map(|s| s.sop_uid()).collect();
        assert_eq!(uids, ["a", "b", "c"]);
    }

    #[test]
    fn test_empty_series_rejected() {
        assert!(matches!(
            Series::new(vec![]),
            Err(ConvertError::NoImagesFound)
        ));
    }

    #[test]
    fn test_invalid_orientation_carries_uid() {
        let sqrt2_2 = std::f64::consts::FRAC_1_SQRT_2;
        // 行/列方向夹角 45 度.
        let bad = SeriesSlice::new(
            "bad-uid",
            4,
            4,
            (1.0, 1.0),
            [0.0; 3],
            [1.0, 0.0, 0.0, sqrt2_2, sqrt2_2, 0.0],
        );
        match Series::new(vec![axial_slice("ok", 0.0), bad]) {
            Err(ConvertError::InvalidGeometry(uid)) => assert_eq!(uid, "bad-uid"),
            other => panic!("预期 InvalidGeometry, 实际为 {other:?}"),
        }
    }

    #[test]
    fn test_shape_accessors() {
        let series = Series::new(vec![SeriesSlice::new(
            "s",
            10,
            12,
            (0.5, 0.5),
            [0.0; 3],
            [1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        )])
        .unwrap();
        assert_eq!(series.plane_shape(), (12, 10));
        assert_eq!(series.mask_shape(), (12, 10, 1));
    }
}
