//! ROI 掩码数据结构.

use std::io::{Read, Write};
use std::ops::{Index, IndexMut};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use ndarray::{Array3, ArrayView2, ArrayView3, ArrayViewMut2, Axis};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Idx2d, Idx3d, Series};

/// 与序列体素网格 1:1 对齐的稠密 3D 布尔掩码.
///
/// 形状为 `(列数, 行数, 切片数)`, 切片顺序与所属 [`Series`] 一致.
/// 每次转换都会创建新的掩码, 不与调用方缓冲区共享.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct RoiMask {
    data: Array3<bool>,
}

impl RoiMask {
    /// 按序列网格创建全背景掩码.
    pub fn zeros(series: &Series) -> Self {
        Self {
            data: Array3::from_elem(series.mask_shape(), false),
        }
    }

    /// 由裸数据直接创建.
    ///
    /// 形状约定为 `(列数, 行数, 切片数)`; 与目标序列的一致性由调用方
    /// 保证, 转换入口处会断言检查.
    #[inline]
    pub fn from_array(data: Array3<bool>) -> Self {
        Self { data }
    }

    /// 掩码形状 `(列数, 行数, 切片数)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        let &[c, r, z] = self.data.shape() else {
            unreachable!()
        };
        (c, r, z)
    }

    /// 切片平面形状 `(列数, 行数)`.
    #[inline]
    pub fn plane_shape(&self) -> Idx2d {
        let (c, r, _) = self.shape();
        (c, r)
    }

    /// 切片个数.
    #[inline]
    pub fn len_z(&self) -> usize {
        self.shape().2
    }

    /// 第 `k` 层切片平面视图, 形状 `(列数, 行数)`.
    ///
    /// 当 `k` 越界时 panic.
    #[inline]
    pub fn plane_at(&self, k: usize) -> ArrayView2<bool> {
        self.data.index_axis(Axis(2), k)
    }

    /// 第 `k` 层切片平面可变视图.
    ///
    /// 当 `k` 越界时 panic.
    #[inline]
    pub fn plane_at_mut(&mut self, k: usize) -> ArrayViewMut2<bool> {
        self.data.index_axis_mut(Axis(2), k)
    }

    /// 前景体素总个数.
    #[inline]
    pub fn count_foreground(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// 掩码是否为全背景.
    #[inline]
    pub fn is_background(&self) -> bool {
        !self.data.iter().any(|&v| v)
    }

    /// 获得底层数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<bool> {
        self.data.view()
    }

    /// 直接获得底层数据.
    #[inline]
    pub fn into_raw(self) -> Array3<bool> {
        self.data
    }

    /// 压缩数据.
    pub fn compress(&self) -> CompactRoiMask {
        let buf: Vec<u8> = self.data.iter().map(|&v| u8::from(v)).collect();
        let mut e = ZlibEncoder::new(Vec::with_capacity(8), Compression::best());
        e.write_all(&buf).expect("Compression error");
        CompactRoiMask {
            buf: e.finish().expect("Compression error"),
            sh: self.shape(),
        }
    }
}

impl Index<Idx3d> for RoiMask {
    type Output = bool;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<Idx3d> for RoiMask {
    #[inline]
    fn index_mut(&mut self, index: Idx3d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

/// 压缩存储的 [`RoiMask`]; 不透明类型.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct CompactRoiMask {
    /// 压缩的不透明字节流.
    buf: Vec<u8>,

    /// 形状.
    sh: Idx3d,
}

impl CompactRoiMask {
    /// 解压缩数据.
    pub fn decompress(self) -> RoiMask {
        let Self { buf, sh: (c, r, z) } = self;
        let mut d = ZlibDecoder::new(buf.as_slice());
        let mut bytes = Vec::with_capacity(c * r * z);
        d.read_to_end(&mut bytes).expect("Decompression error");
        debug_assert_eq!(bytes.len(), c * r * z);
        let data =
            Array3::from_shape_vec((c, r, z), bytes.into_iter().map(|v| v != 0).collect()).unwrap();
        RoiMask { data }
    }
}

/// ROI 描述: 掩码与处理开关.
///
/// 该结构完全透明, 每次转换消费一次.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct RoiData {
    /// 3D 掩码.
    pub mask: RoiMask,

    /// 是否折叠轮廓中的共线点列 (不做任何平滑).
    pub approximate_contours: bool,

    /// 是否启用 pin-hole 拓扑合并.
    pub use_pin_hole: bool,
}

impl RoiData {
    /// 以默认开关 (不化简, 不合并拓扑) 初始化.
    #[inline]
    pub fn new(mask: RoiMask) -> Self {
        Self {
            mask,
            approximate_contours: false,
            use_pin_hole: false,
        }
    }
}
