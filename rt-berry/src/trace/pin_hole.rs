//! pin-hole 拓扑合并.
//!
//! 含孔区域 (如圆环) 的朴素提取会产生外边界与内边界两条多边形.
//! 对只支持简单多边形的消费方, 需要先在掩码上刻出一条连接孔与外部
//! 背景的细缝, 使得再次提取时每个原始区域只产生一条简单多边形.

use log::debug;
use ndarray::{Array2, ArrayView2};

use super::{find_mask_contours, is_hole};
use crate::consts::BACKGROUND;
use crate::{ConvertError, ConvertResult, Idx2d, PlanePt};

/// 为平面掩码中的每个孔刻缝, 返回处理后的副本.
///
/// 对每条内边界轮廓, 从其首点就近的像素出发, 向列索引减小方向扫描,
/// 将沿线前景翻转为背景, 直至抵达已有背景像素. 扫描以平面范围为界:
/// 越过边界仍未遇到背景时返回 [`ConvertError::PinHoleBlocked`],
/// 不产生部分结果.
pub fn create_pin_hole_mask(plane: ArrayView2<bool>) -> ConvertResult<Array2<bool>> {
    let contours = find_mask_contours(plane, false);
    let mut out = plane.to_owned();

    for contour in contours.iter().filter(|c| is_hole(c)) {
        let start = nearest_index(contour[0], out.dim());
        carve_towards_background(&mut out, start)?;
        debug!("在 {start:?} 处为孔刻缝");
    }
    Ok(out)
}

/// 将平面点就近取整并夹到合法索引范围内.
fn nearest_index((d0, d1): PlanePt, (n0, n1): (usize, usize)) -> Idx2d {
    let clamp = |v: f64, n: usize| (v.round().max(0.0) as usize).min(n - 1);
    (clamp(d0, n0), clamp(d1, n1))
}

/// 从 `start` 向列索引减小方向刻缝.
///
/// 每一步先看前方像素: 前方已是背景则立即停止, 因此对落在外边界上
/// 的起点调用是无害的空操作.
fn carve_towards_background(plane: &mut Array2<bool>, start: Idx2d) -> ConvertResult<()> {
    let (mut d0, d1) = start;
    loop {
        if d0 == 0 {
            return Err(ConvertError::PinHoleBlocked((d0, d1)));
        }
        if plane[[d0 - 1, d1]] == BACKGROUND {
            return Ok(());
        }
        plane[[d0, d1]] = BACKGROUND;
        plane[[d0 - 1, d1]] = BACKGROUND;
        d0 -= 1;
    }
}
