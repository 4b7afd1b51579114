//! DICOM 序列加载 (可选功能).
//!
//! 递归读取目录下所有可读且带像素数据的平面图像, 提取几何属性并
//! 构造升序 [`Series`]. 不可读或缺属性的文件被静默跳过.

use std::fs;
use std::path::Path;

use dicom::dictionary_std::tags;
use dicom::object::{open_file, DefaultDicomObject};
use log::debug;

use crate::{ConvertResult, Series, SeriesSlice};

/// 读取 `path` 下的全部平面图像并构造序列.
///
/// 没有像素数据的文件会被丢弃. 结果为空时返回
/// [`crate::ConvertError::NoImagesFound`]; 序列按切片位置升序排序.
pub fn load_series<P: AsRef<Path>>(path: P) -> ConvertResult<Series> {
    let mut slices = Vec::new();
    collect_slices(path.as_ref(), &mut slices);
    debug!("从目录加载到 {} 张切片", slices.len());
    Series::new(slices)
}

/// 递归收集目录下的切片. I/O 错误按不可读文件处理.
fn collect_slices(dir: &Path, out: &mut Vec<SeriesSlice>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_slices(&path, out);
        } else if let Some(slice) = read_slice(&path) {
            out.push(slice);
        } else {
            debug!("跳过非 DICOM 图像文件 {path:?}");
        }
    }
}

/// 从单个文件读取切片几何元数据. 缺失或畸形属性都返回 `None`.
fn read_slice(path: &Path) -> Option<SeriesSlice> {
    let obj: DefaultDicomObject = open_file(path).ok()?;
    obj.element(tags::PIXEL_DATA).ok()?;

    let rows = obj.element(tags::ROWS).ok()?.to_int::<u16>().ok()? as usize;
    let cols = obj.element(tags::COLUMNS).ok()?.to_int::<u16>().ok()? as usize;
    let spacing = obj.element(tags::PIXEL_SPACING).ok()?.to_multi_float64().ok()?;
    let position = obj
        .element(tags::IMAGE_POSITION_PATIENT)
        .ok()?
        .to_multi_float64()
        .ok()?;
    let orientation = obj
        .element(tags::IMAGE_ORIENTATION_PATIENT)
        .ok()?
        .to_multi_float64()
        .ok()?;
    let uid = obj
        .element(tags::SOP_INSTANCE_UID)
        .ok()?
        .to_str()
        .ok()?
        .trim_end_matches('\0')
        .trim()
        .to_owned();

    if spacing.len() != 2 || position.len() != 3 || orientation.len() != 6 {
        return None;
    }
    Some(SeriesSlice::new(
        uid,
        rows,
        cols,
        (spacing[0], spacing[1]),
        [position[0], position[1], position[2]],
        [
            orientation[0],
            orientation[1],
            orientation[2],
            orientation[3],
            orientation[4],
            orientation[5],
        ],
    ))
}
