//! 单切片二值掩码的轮廓提取.
//!
//! 以 marching squares 在 0/1 边界水平上提取拓扑正确的闭合多边形.
//! 平面外侧视作一圈虚拟背景采样点, 因此所有轮廓都保证闭合, 包括
//! 贴着图像边缘的前景.
//!
//! 约定 (固定且全库共享):
//!
//! 1. 输出点按平面索引顺序 `(列, 行)` 存放, 落在半整数网格上;
//! 2. 鞍点处前景按 4-邻接处理, 背景视为全连接, 即 "low" 连接规则;
//! 3. 行进方向左侧始终是前景, 因此外边界的 shoelace 有向面积为正,
//!    孔为负;
//! 4. 闭合为隐式: 首点不在尾部重复.

pub mod pin_hole;

use std::collections::HashSet;

use ndarray::ArrayView2;

use crate::PlanePt;

/// 单元格边. 方向按 (第一维向下, 第二维向右) 的屏幕习惯理解.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

/// 每种单元格配置下的有向线段 `(入边, 出边)`.
///
/// 配置索引为四角前景位图 `TL*8 + TR*4 + BR*2 + BL*1`. 鞍点配置
/// (5 和 10) 按前景 4-邻接拆成两段互不相连的线段.
const fn segments(case: u8) -> &'static [(Edge, Edge)] {
    use Edge::*;
    match case {
        1 => &[(Bottom, Left)],
        2 => &[(Right, Bottom)],
        3 => &[(Right, Left)],
        4 => &[(Top, Right)],
        5 => &[(Top, Right), (Bottom, Left)],
        6 => &[(Top, Bottom)],
        7 => &[(Top, Left)],
        8 => &[(Left, Top)],
        9 => &[(Bottom, Top)],
        10 => &[(Left, Top), (Right, Bottom)],
        11 => &[(Right, Top)],
        12 => &[(Left, Right)],
        13 => &[(Bottom, Right)],
        14 => &[(Left, Bottom)],
        _ => &[],
    }
}

/// 入边中点, 即轮廓在该单元格的采样点.
#[inline]
fn edge_midpoint(a: isize, b: isize, e: Edge) -> PlanePt {
    let (a, b) = (a as f64, b as f64);
    match e {
        Edge::Top => (a, b + 0.5),
        Edge::Right => (a + 0.5, b + 1.0),
        Edge::Bottom => (a + 1.0, b + 0.5),
        Edge::Left => (a + 0.5, b),
    }
}

/// 穿过 `exit` 边后进入的相邻单元格与对应入边.
#[inline]
fn neighbour(a: isize, b: isize, exit: Edge) -> (isize, isize, Edge) {
    match exit {
        Edge::Top => (a - 1, b, Edge::Bottom),
        Edge::Right => (a, b + 1, Edge::Left),
        Edge::Bottom => (a + 1, b, Edge::Top),
        Edge::Left => (a, b - 1, Edge::Right),
    }
}

/// 提取平面掩码中的全部闭合轮廓.
///
/// `approximate` 为 `true` 时折叠共线点列 (轴对齐矩形块退化为 8
/// 顶点八边形), 为 `false` 时保留每个单元格边上的原始交点, 不做
/// 任何平滑. 全背景平面返回空集而不报错; 非空校验由上层编排器在
/// 坐标格式化之前负责.
pub fn find_mask_contours(plane: ArrayView2<bool>, approximate: bool) -> Vec<Vec<PlanePt>> {
    let (n0, n1) = plane.dim();
    let (n0, n1) = (n0 as isize, n1 as isize);

    // 越界采样点视作背景, 由此多出一圈宽度为 1 的虚拟单元格.
    let at =
        |i: isize, j: isize| i >= 0 && j >= 0 && i < n0 && j < n1 && plane[[i as usize, j as usize]];
    let case_of = |a: isize, b: isize| {
        (u8::from(at(a, b)) << 3)
            | (u8::from(at(a, b + 1)) << 2)
            | (u8::from(at(a + 1, b + 1)) << 1)
            | u8::from(at(a + 1, b))
    };

    let mut visited: HashSet<(isize, isize, Edge)> = HashSet::new();
    let mut contours = Vec::new();

    for a in -1..n0 {
        for b in -1..n1 {
            for &(entry, _) in segments(case_of(a, b)) {
                if !visited.contains(&(a, b, entry)) {
                    contours.push(walk(a, b, entry, &case_of, &mut visited));
                }
            }
        }
    }

    if approximate {
        contours.iter().map(|c| simplify_collinear(c)).collect()
    } else {
        contours
    }
}

/// 从 `(a0, b0)` 的 `e0` 入边出发, 沿线段方向走完一条闭合轮廓.
fn walk<F: Fn(isize, isize) -> u8>(
    a0: isize,
    b0: isize,
    e0: Edge,
    case_of: &F,
    visited: &mut HashSet<(isize, isize, Edge)>,
) -> Vec<PlanePt> {
    let mut pts = Vec::with_capacity(8);
    let (mut a, mut b, mut entry) = (a0, b0, e0);

    loop {
        visited.insert((a, b, entry));
        pts.push(edge_midpoint(a, b, entry));

        // 入边在当前配置下必有唯一出边.
        let Some(&(_, exit)) = segments(case_of(a, b)).iter().find(|&&(e, _)| e == entry) else {
            unreachable!()
        };
        (a, b, entry) = neighbour(a, b, exit);
        if (a, b, entry) == (a0, b0, e0) {
            break;
        }
    }
    debug_assert!(pts.len() >= 4);
    pts
}

/// 轮廓的 shoelace 有向面积 (平面索引系, 首尾隐式相连).
///
/// 外边界为正, 孔为负.
pub fn signed_area(contour: &[PlanePt]) -> f64 {
    let n = contour.len();
    let mut acc = 0.0;
    for i in 0..n {
        let (x0, y0) = contour[i];
        let (x1, y1) = contour[(i + 1) % n];
        acc += x0 * y1 - x1 * y0;
    }
    acc / 2.0
}

/// 该轮廓是否为孔 (内边界)?
#[inline]
pub fn is_hole(contour: &[PlanePt]) -> bool {
    signed_area(contour) < 0.0
}

/// 折叠轮廓中的共线点列 (首尾视为相连).
///
/// 点都落在半整数网格上, 叉积在 `f64` 下是精确的, 可以直接与 0 比较.
fn simplify_collinear(pts: &[PlanePt]) -> Vec<PlanePt> {
    let n = pts.len();
    if n < 4 {
        return pts.to_vec();
    }
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let (px, py) = pts[(i + n - 1) % n];
        let (qx, qy) = pts[i];
        let (rx, ry) = pts[(i + 1) % n];
        let cross = (qx - px) * (ry - py) - (qy - py) * (rx - px);
        if cross != 0.0 {
            out.push((qx, qy));
        }
    }
    out
}
