#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 提供 RT 结构集 ROI 的两种表示 (逐切片患者坐标闭合轮廓 /
//! 对齐图像网格的 3D 布尔体素掩码) 之间的双向几何转换.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 本 crate 只负责几何转换本身. 容器格式 (DICOM 文件) 的读取通过
//!   `dicom` feature 提供的窄接口完成, 写回与展示不在职责范围内.
//! 2. 一个 `Series` 中的所有切片被假定共享方向与像素间距
//!   (不做防御式检查). 序列构造时按法向投影升序排序.
//! 3. 在非期望情况下 (如掩码与序列形状不符), 程序会直接 panic,
//!   而不会导致内存错误. As what Rust promises.
//!
//! # 坐标约定
//!
//! 这是全库最容易踩坑的地方, 约定集中在一处, 由一对命名函数实现并单独测试:
//!
//! 1. 掩码形状为 `(列数, 行数, 切片数)`. 第 `k` 层切片平面是 `Axis(2)`
//!   上的截面, 平面索引顺序为 `(列, 行)`.
//! 2. 仿射变换接受的像素坐标顺序为 `(行, 列, 层)`. 平面索引与像素坐标
//!   之间的互换由 [`convert`] 模块边界上的转换函数统一完成,
//!   两个转换方向都经过同一对函数.
//! 3. 轮廓提取结果中, 外边界在平面索引系下 shoelace 有向面积为正,
//!   孔为负. 闭合为隐式 (首点不重复出现在尾部).
//!
//! # 功能
//!
//! ### 切片几何解析与 4x4 仿射变换 ✅
//!
//! 方向余弦正交性校验, 层间距推导 (单切片哨兵值), 像素/患者坐标互换.
//!
//! 实现位于 `rt-berry/src/geom`.
//!
//! ### marching squares 轮廓提取与 pin-hole 拓扑合并 ✅
//!
//! 0/1 边界水平的拓扑正确轮廓, 可选共线化简; 含孔区域经 pin-hole
//! 刻缝后可由单条简单多边形表示.
//!
//! 实现位于 `rt-berry/src/trace`.
//!
//! ### 扫描线多边形栅格化 ✅
//!
//! even-odd 规则, 多条轮廓取并集写回切片平面.
//!
//! 实现位于 `rt-berry/src/raster`.
//!
//! ### 序列级双向转换 ✅
//!
//! `contours_from_mask` / `mask_from_contours`, 逐切片纯函数 + 按索引
//! 合并, 可选 rayon 并行与协作式取消.
//!
//! 实现位于 `rt-berry/src/convert`.

/// 二维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 切片平面上的高精度点, 按平面索引顺序 `(列, 行)` 存放.
pub type PlanePt = (f64, f64);

/// 三维方向向量 / 患者坐标点.
pub type Vec3 = [f64; 3];

pub mod consts;

mod error;

pub use error::{ConvertError, ConvertResult};

/// 切片元数据与序列, 掩码基础数据结构.
mod data;

pub use data::{CompactRoiMask, ContourItem, RoiData, RoiMask, Series, SeriesSlice};

pub mod convert;
pub mod geom;
pub mod raster;
pub mod trace;

#[cfg(feature = "dicom")]
pub mod dicom;

pub mod prelude;
