use crate::config::PackConfig;
use crate::model::{PackReport, Region};
use crate::normalize::to_pixels;
use serde::Serialize;
use serde_json::{Value, json};

/// Serialize packed regions as `{ meta, regions }`.
///
/// Each region carries its layout-space rect (in the configured units) and the
/// rounded pixel rect on the configured atlas.
pub fn to_json<K: Serialize>(regions: &[Region<K>], cfg: &PackConfig, report: Option<&PackReport>) -> Value {
    let regions_val: Vec<Value> = regions
        .iter()
        .map(|r| {
            let px = to_pixels(r, cfg.atlas_width, cfg.atlas_height, cfg.units);
            json!({
                "key": r.key,
                "rect": {"x": r.x, "y": r.y, "w": r.w, "h": r.h},
                "pixels": {"x": px.x, "y": px.y, "w": px.w, "h": px.h},
            })
        })
        .collect();
    let mut meta = json!({
        "app": "atlazzer",
        "version": env!("CARGO_PKG_VERSION"),
        "strategy": cfg.strategy,
        "units": cfg.units,
        "atlas": {"w": cfg.atlas_width, "h": cfg.atlas_height},
    });
    if let Some(rep) = report {
        meta["trials"] = json!(rep.trials);
        meta["cost"] = json!(rep.cost);
        meta["size"] = json!({"w": rep.width, "h": rep.height});
        meta["occupancy"] = json!(rep.occupancy());
        meta["warnings"] = rep.warnings.iter().map(|w| json!(w.to_string())).collect();
    }
    json!({
        "meta": meta,
        "regions": regions_val,
    })
}
