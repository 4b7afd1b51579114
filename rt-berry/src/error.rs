//! 运行时错误.

use crate::Idx2d;

/// 几何转换的运行时错误.
///
/// 所有错误对同一输入都是确定性的. 任一错误都会中止整个转换,
/// 不会产生部分掩码或部分轮廓结果.
#[derive(Debug, Clone)]
pub enum ConvertError {
    /// 输入序列为空 (路径下没有可读的带像素图像).
    NoImagesFound,

    /// 切片方向校验失败 (行/列方向不正交, 或法向量非单位长度).
    ///
    /// 参数为问题切片的 SOP Instance UID.
    InvalidGeometry(String),

    /// 在非空切片平面上提取不到任何轮廓.
    ///
    /// 参数为问题切片在序列中的下标. 这是调用方输入错误,
    /// 通常意味着掩码数据格式不符合约定.
    EmptyContour(usize),

    /// pin-hole 刻缝扫描在抵达背景像素之前越过了平面边界.
    ///
    /// 参数为扫描停住时的平面索引 `(列, 行)`.
    PinHoleBlocked(Idx2d),

    /// 调用方通过协作式取消标志中止了转换.
    Cancelled,
}

/// 几何转换结果.
pub type ConvertResult<T> = Result<T, ConvertError>;
