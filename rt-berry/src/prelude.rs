//! 🫐 欢迎光临 🫐
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx3d, PlanePt, Vec3};

pub use crate::{CompactRoiMask, ContourItem, RoiData, RoiMask, Series, SeriesSlice};

pub use crate::convert::{
    contours_from_mask, contours_from_mask_with_cancel, mask_from_contours,
    mask_from_contours_with_cancel, ContourSet,
};

#[cfg(feature = "rayon")]
pub use crate::convert::{par_contours_from_mask, par_mask_from_contours};

pub use crate::geom::PatientTransform;

pub use crate::consts::{BACKGROUND, FOREGROUND, SINGLE_SLICE_SPACING};

pub use crate::{ConvertError, ConvertResult};

#[cfg(feature = "dicom")]
pub use crate::dicom::load_series;
