//! Scan pipeline: read, preprocess, transform, report

use std::fs;
use std::path::Path;

use anyhow::{bail, Context as _, Result};
use mask_model::{deltafy_n, surroundify, DensityMap, Direction, MaskList, SurroundRange, UsedBitmap};
use serde::Serialize;
use sweep_engine::{Context, ModeKind, TransformRequest, TransformResult};
use tracing::{debug, info};

use crate::ScanSettings;

/// Best sweeps of one haystack
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub haystack: String,
    pub mask_count: usize,
    pub sweep_len: u64,
    /// Scores as floats, in nats or as fractions depending on the mode
    pub values: Vec<f64>,
    pub result: TransformResult,
}

/// Masks after preprocessing, plus the narrowed mask_max when remapped
#[derive(Debug)]
pub struct Preprocessed {
    pub needle: Option<MaskList>,
    pub haystacks: Vec<(String, MaskList)>,
    pub mask_max: Option<u32>,
}

fn read_masks(path: &Path, settings: &ScanSettings) -> Result<MaskList> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mut list = MaskList::default();
    let counted = list
        .load(&bytes, settings.engine.granularity, settings.engine.overlap)
        .with_context(|| format!("Failed to extract masks from {}", path.display()))?;
    if counted.ignored_tail {
        debug!("{}: trailing partial mask ignored", path.display());
    }
    list.check_max(settings.engine.mask_max)
        .with_context(|| format!("{} holds masks above mask_max", path.display()))?;
    Ok(list)
}

/// Applies deltafy, densify and surroundify, in that order, jointly over the
/// needle and every haystack.
pub fn preprocess(
    settings: &ScanSettings,
    mut needle: Option<MaskList>,
    mut haystacks: Vec<(String, MaskList)>,
) -> Result<Preprocessed> {
    let engine = &settings.engine;
    let mut lists: Vec<&mut MaskList> = needle
        .iter_mut()
        .chain(haystacks.iter_mut().map(|(_, list)| list))
        .collect();

    if settings.deltafy > 0 {
        for list in lists.iter_mut() {
            deltafy_n(
                list.as_mut_slice(),
                settings.deltafy,
                engine.granularity,
                engine.mask_max,
                settings.channelize,
                Direction::Apply,
            )?;
        }
    }

    let mut mask_max = None;
    if settings.densify {
        let mut used = UsedBitmap::try_new(engine.mask_max)?;
        for list in &lists {
            used.mark(list.as_slice())?;
        }
        let map = DensityMap::build(&used)?;
        for list in lists.iter_mut() {
            map.densify(list.as_mut_slice())?;
        }
        info!("Densified {} used masks", used.count_used());
        mask_max = Some(map.mask_max());
    }

    if settings.surroundify {
        let slices: Vec<&[u32]> = lists.iter().map(|list| list.as_slice()).collect();
        if let Some(range) = SurroundRange::joint(&slices) {
            for list in lists.iter_mut() {
                surroundify(list.as_mut_slice(), range)?;
            }
            debug!("Surroundified over {:#X}..={:#X}", range.min, range.max);
            mask_max = Some(range.mask_max());
        }
    }

    Ok(Preprocessed {
        needle,
        haystacks,
        mask_max,
    })
}

/// Runs the configured mode over lists already in memory.
pub fn scan_lists(settings: &ScanSettings, lists: Preprocessed) -> Result<Vec<ScanReport>> {
    let mode = settings.mode;
    let mut context = Context::from_config(settings.engine.clone())?;
    let mut overridden;
    let context: &mut Context = match lists.mask_max {
        Some(mask_max) => {
            overridden = context.override_mask_max(mask_max)?;
            &mut overridden
        }
        None => &mut context,
    };

    let divergence = mode.kind() == ModeKind::Divergence;
    if mode.capability().needle {
        let Some(needle) = &lists.needle else {
            bail!("Mode {} needs a needle file", mode);
        };
        context.load_needle(needle.as_slice())?;
    }

    let request = TransformRequest::new(mode, settings.sweep_len)
        .ranked(settings.rank_count, settings.order);
    let mut reports = Vec::with_capacity(lists.haystacks.len());
    for (name, haystack) in &lists.haystacks {
        let result = if divergence {
            context.divergence_transform(&request, haystack.as_slice())
        } else {
            context.transform(&request, haystack.as_slice())
        }
        .with_context(|| format!("{} transform of {} failed", mode, name))?;

        info!(
            "{}: {} sweeps scored, best {:?}",
            name,
            result.sweep_count,
            result.value_f64(0)
        );
        reports.push(ScanReport {
            haystack: name.clone(),
            mask_count: haystack.len(),
            sweep_len: settings.sweep_len,
            values: result.values_f64(),
            result,
        });
    }
    Ok(reports)
}

/// Reads every configured file and scans each haystack.
pub fn run(settings: &ScanSettings) -> Result<Vec<ScanReport>> {
    if settings.haystacks.is_empty() {
        bail!("No haystack files configured");
    }
    let needle = settings
        .needle
        .as_deref()
        .map(|path| read_masks(path, settings))
        .transpose()?;
    let haystacks = settings
        .haystacks
        .iter()
        .map(|path| Ok((path.display().to_string(), read_masks(path, settings)?)))
        .collect::<Result<Vec<_>>>()?;

    let lists = preprocess(settings, needle, haystacks)?;
    scan_lists(settings, lists)
}
