//! 像素空间多边形到切片平面的栅格化.

use ndarray::Array2;

use crate::{Idx2d, PlanePt};

/// 将一组平面坐标多边形填充进 `(列数, 行数)` 的布尔平面.
///
/// 顶点先就近取整到像素格点 (恰为 0.5 的分量向远离零方向进位),
/// 再按 even-odd 扫描线规则填充: 某像素被置位, 当且仅当其同行右侧
/// 严格大于该像素坐标的边交点个数为奇数 (半开边界行为). 单条多边形
/// 内部的自交由 even-odd 规则裁决; 多条多边形之间只做并集, 嵌套轮廓
/// 不会相互抵消.
pub fn fill_polygons(shape: Idx2d, polygons: &[Vec<PlanePt>]) -> Array2<bool> {
    let mut out = Array2::from_elem(shape, false);
    for poly in polygons {
        fill_one(&mut out, poly);
    }
    out
}

/// 单条多边形的扫描线填充, 结果与 `out` 已有内容取并集.
fn fill_one(out: &mut Array2<bool>, poly: &[PlanePt]) {
    if poly.len() < 3 {
        return;
    }
    let verts: Vec<(i64, i64)> = poly
        .iter()
        .map(|&(d0, d1)| (d0.round() as i64, d1.round() as i64))
        .collect();

    let (n0, n1) = out.dim();
    // 序列非空, unwrap 安全.
    let lo = verts.iter().map(|v| v.0).min().unwrap().max(0);
    let hi = verts.iter().map(|v| v.0).max().unwrap().min(n0 as i64 - 1);

    let mut xs: Vec<f64> = Vec::with_capacity(8);
    for d0 in lo..=hi {
        let y = d0 as f64;

        // 收集扫描行与各边的交点. `>` 的半开判定保证顶点恰好落在行上
        // 时只计一侧, 与行平行的边不参与.
        xs.clear();
        for (i, &(a0, a1)) in verts.iter().enumerate() {
            let (b0, b1) = verts[(i + 1) % verts.len()];
            let (ay, ax) = (a0 as f64, a1 as f64);
            let (by, bx) = (b0 as f64, b1 as f64);
            if (ay > y) != (by > y) {
                xs.push(ax + (bx - ax) * (y - ay) / (by - ay));
            }
        }
        xs.sort_by(f64::total_cmp);

        for pair in xs.chunks_exact(2) {
            let from = (pair[0].ceil() as i64).max(0);
            let to = ((pair[1].ceil() as i64) - 1).min(n1 as i64 - 1);
            for d1 in from..=to {
                out[[d0 as usize, d1 as usize]] = true;
            }
        }
    }
}
