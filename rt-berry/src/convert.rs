//! 序列级双向转换编排.
//!
//! 逐切片工作都以纯函数表达, 结果按切片下标合并进预先分配的输出,
//! 串行, 取消与并行路径共享同一套逐切片实现. 任一切片出错都会中止
//! 整个转换, 不产生部分结果.

use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use ndarray::{Array2, ArrayView2};

use crate::geom::PatientTransform;
use crate::{
    raster, trace, ContourItem, ConvertError, ConvertResult, Idx2d, PlanePt, RoiData, RoiMask,
    Series,
};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
    }
}

/// 一张切片上的全部输出轮廓, 每条为展平的患者坐标表.
pub type ContourSet = Vec<Vec<f64>>;

/// 平面索引 `(列, 行)` 与层号 -> 变换像素坐标 `(行, 列, 层)`.
///
/// 平面索引与变换坐标之间唯一的分量互换发生在这里及其逆
/// [`pixel_to_plane`], 两个转换方向共用, 单独测试.
#[inline]
fn plane_to_pixel((d0, d1): PlanePt, k: usize) -> [f64; 3] {
    [d1, d0, k as f64]
}

/// 变换像素坐标 -> 平面索引 `(列, 行)`. [`plane_to_pixel`] 的逆.
#[inline]
fn pixel_to_plane(p: [f64; 3]) -> PlanePt {
    (p[1], p[0])
}

/// 掩码 -> 轮廓.
///
/// 返回值与序列切片一一对应, 全背景切片对应空列表. 每条轮廓为
/// `(x1, y1, z1, x2, ...)` 形式的展平患者坐标, 闭合为隐式.
///
/// # Panics
///
/// 当 `roi.mask` 形状与序列网格不一致时 panic.
///
/// # 示例
///
/// ```
/// use rt_berry::prelude::*;
///
/// let slice = SeriesSlice::new(
///     "1.2.840.1",
///     6,
///     6,
///     (1.0, 1.0),
///     [0.0, 0.0, 0.0],
///     [1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
/// );
/// let series = Series::new(vec![slice]).unwrap();
///
/// let mut roi = RoiData::new(RoiMask::zeros(&series));
/// roi.mask[(2, 2, 0)] = true;
///
/// let contours = contours_from_mask(&roi, &series).unwrap();
/// assert_eq!(contours.len(), 1);
/// assert_eq!(contours[0].len(), 1);
/// ```
pub fn contours_from_mask(roi: &RoiData, series: &Series) -> ConvertResult<Vec<ContourSet>> {
    contours_from_mask_inner(roi, series, None)
}

/// 带协作式取消的 [`contours_from_mask`].
///
/// 每张切片处理之前检查一次 `cancel`, 置位后返回
/// [`ConvertError::Cancelled`], 不产生部分结果.
pub fn contours_from_mask_with_cancel(
    roi: &RoiData,
    series: &Series,
    cancel: &AtomicBool,
) -> ConvertResult<Vec<ContourSet>> {
    contours_from_mask_inner(roi, series, Some(cancel))
}

fn contours_from_mask_inner(
    roi: &RoiData,
    series: &Series,
    cancel: Option<&AtomicBool>,
) -> ConvertResult<Vec<ContourSet>> {
    assert_eq!(roi.mask.shape(), series.mask_shape(), "掩码与序列形状不一致");
    let tf = PatientTransform::forward(series)?;

    let mut out = Vec::with_capacity(series.len());
    for k in 0..series.len() {
        if matches!(cancel, Some(c) if c.load(Ordering::Relaxed)) {
            return Err(ConvertError::Cancelled);
        }
        out.push(slice_contours(roi.mask.plane_at(k), k, roi, &tf)?);
    }
    Ok(out)
}

/// 单张切片的掩码 -> 轮廓纯函数.
fn slice_contours(
    plane: ArrayView2<bool>,
    k: usize,
    roi: &RoiData,
    tf: &PatientTransform,
) -> ConvertResult<ContourSet> {
    // 全背景切片不产生 ROI 轮廓.
    if !plane.iter().any(|&v| v) {
        debug!("切片 {k} 为全背景, 跳过轮廓提取");
        return Ok(vec![]);
    }

    let contours = if roi.use_pin_hole {
        let merged = trace::pin_hole::create_pin_hole_mask(plane)?;
        trace::find_mask_contours(merged.view(), roi.approximate_contours)
    } else {
        trace::find_mask_contours(plane, roi.approximate_contours)
    };
    if contours.is_empty() {
        return Err(ConvertError::EmptyContour(k));
    }

    let mut formatted = Vec::with_capacity(contours.len());
    for contour in &contours {
        let flat: Vec<f64> = contour
            .iter()
            .flat_map(|&pt| plane_to_pixel(pt, k))
            .collect();
        // 长度恰为 3N, from_shape_vec 不会失败.
        let pixel = Array2::from_shape_vec((contour.len(), 3), flat).unwrap();
        formatted.push(tf.apply(pixel.view()).into_raw_vec());
    }
    Ok(formatted)
}

/// 轮廓 -> 掩码.
///
/// 输出掩码形状为 `(列数, 行数, 切片数)`. 每张切片只消费
/// `referenced_uid` 与其 SOP Instance UID 相符的轮廓, 无匹配轮廓的
/// 切片保持全背景. 同一切片的多条轮廓取并集 (嵌套轮廓不做减除).
///
/// # Panics
///
/// 当任一轮廓的坐标表长度不是 3 的倍数时 panic.
pub fn mask_from_contours(series: &Series, contours: &[ContourItem]) -> ConvertResult<RoiMask> {
    mask_from_contours_inner(series, contours, None)
}

/// 带协作式取消的 [`mask_from_contours`].
pub fn mask_from_contours_with_cancel(
    series: &Series,
    contours: &[ContourItem],
    cancel: &AtomicBool,
) -> ConvertResult<RoiMask> {
    mask_from_contours_inner(series, contours, Some(cancel))
}

fn mask_from_contours_inner(
    series: &Series,
    contours: &[ContourItem],
    cancel: Option<&AtomicBool>,
) -> ConvertResult<RoiMask> {
    let tf = PatientTransform::inverse(series)?;
    let mut mask = RoiMask::zeros(series);

    for (k, slice) in series.iter().enumerate() {
        if matches!(cancel, Some(c) if c.load(Ordering::Relaxed)) {
            return Err(ConvertError::Cancelled);
        }
        if let Some(plane) = slice_mask(slice.sop_uid(), series.plane_shape(), contours, &tf) {
            mask.plane_at_mut(k).assign(&plane);
        }
    }
    Ok(mask)
}

/// 单张切片的轮廓 -> 平面掩码纯函数. 无匹配轮廓时返回 `None`.
fn slice_mask(
    sop_uid: &str,
    shape: Idx2d,
    contours: &[ContourItem],
    tf: &PatientTransform,
) -> Option<Array2<bool>> {
    let polygons: Vec<Vec<PlanePt>> = contours
        .iter()
        .filter(|c| c.referenced_uid == sop_uid)
        .map(|c| project_contour(&c.data, tf))
        .collect();
    if polygons.is_empty() {
        return None;
    }
    Some(raster::fill_polygons(shape, &polygons))
}

/// 将一条展平患者坐标轮廓投影回平面索引系.
fn project_contour(data: &[f64], tf: &PatientTransform) -> Vec<PlanePt> {
    assert_eq!(data.len() % 3, 0, "轮廓坐标表长度不是 3 的倍数");
    // 长度已校验, from_shape 不会失败.
    let pts = ArrayView2::from_shape((data.len() / 3, 3), data).unwrap();
    let pixel = tf.apply(pts);
    pixel
        .outer_iter()
        .map(|p| pixel_to_plane([p[0], p[1], p[2]]))
        .collect()
}

/// 借助 `rayon`, 并行地执行 [`contours_from_mask`].
///
/// 每张切片只读取自身平面, 共享的只读变换与 ROI 开关, 结果按切片
/// 下标合并, 与串行路径逐位一致.
#[cfg(feature = "rayon")]
pub fn par_contours_from_mask(roi: &RoiData, series: &Series) -> ConvertResult<Vec<ContourSet>> {
    assert_eq!(roi.mask.shape(), series.mask_shape(), "掩码与序列形状不一致");
    let tf = PatientTransform::forward(series)?;
    (0..series.len())
        .into_par_iter()
        .map(|k| slice_contours(roi.mask.plane_at(k), k, roi, &tf))
        .collect()
}

/// 借助 `rayon`, 并行地执行 [`mask_from_contours`].
///
/// 各切片平面先并行算出, 再按下标串行写回预分配掩码, 写入互不重叠.
#[cfg(feature = "rayon")]
pub fn par_mask_from_contours(
    series: &Series,
    contours: &[ContourItem],
) -> ConvertResult<RoiMask> {
    let tf = PatientTransform::inverse(series)?;
    let planes: Vec<Option<Array2<bool>>> = (0..series.len())
        .into_par_iter()
        .map(|k| slice_mask(series.get(k).sop_uid(), series.plane_shape(), contours, &tf))
        .collect();

    let mut mask = RoiMask::zeros(series);
    for (k, plane) in planes.into_iter().enumerate() {
        if let Some(plane) = plane {
            mask.plane_at_mut(k).assign(&plane);
        }
    }
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::{
        contours_from_mask, contours_from_mask_with_cancel, mask_from_contours, pixel_to_plane,
        plane_to_pixel,
    };
    use crate::{ContourItem, ConvertError, RoiData, RoiMask, Series, SeriesSlice};

    /// 以单位方向, z 轴堆叠, 间距 1 构造测试序列.
    fn axial_series(n: usize, rows: usize, cols: usize) -> Series {
        let slices = (0..n)
            .map(|i| {
                SeriesSlice::new(
                    format!("1.2.{i}"),
                    rows,
                    cols,
                    (1.0, 1.0),
                    [0.0, 0.0, i as f64],
                    [1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
                )
            })
            .collect();
        Series::new(slices).unwrap()
    }

    fn fill_block(roi: &mut RoiData, k: usize, d0: (usize, usize), d1: (usize, usize)) {
        for i in d0.0..=d0.1 {
            for j in d1.0..=d1.1 {
                roi.mask[(i, j, k)] = true;
            }
        }
    }

    #[test]
    fn test_plane_pixel_conversion_involution() {
        let p = plane_to_pixel((4.5, 7.0), 2);
        assert_eq!(p, [7.0, 4.5, 2.0]);
        assert_eq!(pixel_to_plane(p), (4.5, 7.0));
    }

    #[test]
    fn test_block_end_to_end() {
        // 10x10x3, 仅切片 1 上有 4x4 前景块.
        let series = axial_series(3, 10, 10);
        let mut roi = RoiData::new(RoiMask::zeros(&series));
        roi.approximate_contours = true;
        fill_block(&mut roi, 1, (3, 6), (3, 6));

        let contours = contours_from_mask(&roi, &series).unwrap();
        assert_eq!(contours.len(), 3);
        assert!(contours[0].is_empty());
        assert!(contours[2].is_empty());
        assert_eq!(contours[1].len(), 1);
        // 八边形: 8 个顶点, 24 个坐标分量.
        assert_eq!(contours[1][0].len(), 24);
        // z 分量等于切片 1 的患者坐标 z.
        assert!(contours[1][0].chunks(3).all(|p| (p[2] - 1.0).abs() < 1e-9));

        // 轮廓回填后应精确复原原掩码.
        let items: Vec<ContourItem> = contours[1]
            .iter()
            .map(|c| ContourItem::new(series.get(1).sop_uid(), c.clone()))
            .collect();
        let rebuilt = mask_from_contours(&series, &items).unwrap();
        assert_eq!(rebuilt.data(), roi.mask.data());
    }

    #[test]
    fn test_non_square_grid_roundtrip() {
        // 非方形网格下的往返, 检验平面/像素分量互换两侧一致.
        let series = axial_series(1, 10, 12);
        let mut roi = RoiData::new(RoiMask::zeros(&series));
        fill_block(&mut roi, 0, (2, 5), (3, 7));

        let contours = contours_from_mask(&roi, &series).unwrap();
        let items: Vec<ContourItem> = contours[0]
            .iter()
            .map(|c| ContourItem::new(series.get(0).sop_uid(), c.clone()))
            .collect();
        let rebuilt = mask_from_contours(&series, &items).unwrap();
        assert_eq!(rebuilt.data(), roi.mask.data());
    }

    #[test]
    fn test_empty_slices_skipped_without_error() {
        let series = axial_series(3, 6, 6);
        let roi = RoiData::new(RoiMask::zeros(&series));
        let contours = contours_from_mask(&roi, &series).unwrap();
        assert_eq!(contours.len(), 3);
        assert!(contours.iter().all(|set| set.is_empty()));
    }

    #[test]
    fn test_pin_hole_merges_to_one_contour() {
        let series = axial_series(1, 9, 9);
        let mut roi = RoiData::new(RoiMask::zeros(&series));
        fill_block(&mut roi, 0, (1, 6), (1, 6));
        roi.mask[(3, 3, 0)] = false;
        roi.mask[(3, 4, 0)] = false;

        let plain = contours_from_mask(&roi, &series).unwrap();
        assert_eq!(plain[0].len(), 2);

        roi.use_pin_hole = true;
        let merged = contours_from_mask(&roi, &series).unwrap();
        assert_eq!(merged[0].len(), 1);
    }

    #[test]
    fn test_unmatched_contours_leave_background() {
        let series = axial_series(2, 6, 6);
        let items = [ContourItem::new(
            "no-such-uid",
            vec![1.0, 1.0, 0.0, 1.0, 3.0, 0.0, 3.0, 3.0, 0.0],
        )];
        let mask = mask_from_contours(&series, &items).unwrap();
        assert!(mask.is_background());
    }

    #[test]
    fn test_union_of_multiple_contours() {
        // 同一切片的两条轮廓取并集.
        let series = axial_series(1, 8, 8);
        let uid = series.get(0).sop_uid();
        let square = |d0: f64, d1: f64| {
            // 顶点按 (行, 列) = (d1, d0) 进入患者坐标, 单位几何下
            // 患者 (x, y) = (行, 列).
            vec![
                d1, d0, 0.0, //
                d1 + 2.0, d0, 0.0, //
                d1 + 2.0, d0 + 2.0, 0.0, //
                d1, d0 + 2.0, 0.0,
            ]
        };
        let items = [
            ContourItem::new(uid, square(1.0, 1.0)),
            ContourItem::new(uid, square(5.0, 5.0)),
        ];
        let mask = mask_from_contours(&series, &items).unwrap();
        assert_eq!(mask.count_foreground(), 8);
    }

    #[test]
    fn test_cancel_aborts_without_result() {
        let series = axial_series(4, 6, 6);
        let roi = RoiData::new(RoiMask::zeros(&series));
        let cancel = AtomicBool::new(false);
        cancel.store(true, Ordering::Relaxed);
        assert!(matches!(
            contours_from_mask_with_cancel(&roi, &series, &cancel),
            Err(ConvertError::Cancelled)
        ));
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_parallel_matches_serial() {
        use super::{par_contours_from_mask, par_mask_from_contours};

        let series = axial_series(4, 10, 10);
        let mut roi = RoiData::new(RoiMask::zeros(&series));
        roi.approximate_contours = true;
        fill_block(&mut roi, 0, (2, 4), (2, 4));
        fill_block(&mut roi, 2, (5, 8), (1, 3));

        let serial = contours_from_mask(&roi, &series).unwrap();
        let parallel = par_contours_from_mask(&roi, &series).unwrap();
        assert_eq!(serial, parallel);

        let items: Vec<ContourItem> = serial
            .iter()
            .enumerate()
            .flat_map(|(k, set)| {
                set.iter()
                    .map(move |c| (k, c.clone()))
                    .collect::<Vec<_>>()
            })
            .map(|(k, c)| ContourItem::new(series.get(k).sop_uid(), c))
            .collect();
        let a = mask_from_contours(&series, &items).unwrap();
        let b = par_mask_from_contours(&series, &items).unwrap();
        assert_eq!(a.data(), b.data());
        assert_eq!(a.data(), roi.mask.data());
    }
}
