use atlazzer_core::packer::pow2::decode_slot;
use atlazzer_core::prelude::*;

fn disjoint(rects: &[PixelRect]) -> bool {
    for i in 0..rects.len() {
        for j in (i + 1)..rects.len() {
            let a = &rects[i];
            let b = &rects[j];
            if !(a.x >= b.right() || b.x >= a.right() || a.y >= b.bottom() || b.y >= a.bottom()) {
                return false;
            }
        }
    }
    true
}

fn pixels() -> PackConfig {
    PackConfig::builder()
        .strategy(Strategy::PowerOfTwo)
        .units(Units::Pixels)
        .with_atlas_dimensions(2048, 2048)
        .build()
}

#[test]
fn four_quadrants_of_2048() {
    let layout = Pow2Packer::pack(2048, 2048, &[(1024, 1024); 4]).expect("pack");
    let pos: Vec<(u32, u32)> = layout.rects.iter().map(|r| (r.x, r.y)).collect();
    assert_eq!(pos, vec![(0, 0), (1024, 0), (0, 1024), (1024, 1024)]);
    assert!(layout.warnings.is_empty());
}

#[test]
fn morton_decode_interleaves_bits() {
    assert_eq!(decode_slot(0), (0, 0));
    assert_eq!(decode_slot(1), (1, 0));
    assert_eq!(decode_slot(2), (0, 1));
    assert_eq!(decode_slot(3), (1, 1));
    assert_eq!(decode_slot(0b1000), (0, 2));
    assert_eq!(decode_slot(0b1111), (3, 3));
    assert_eq!(decode_slot(0b10001), (5, 0));
    assert_eq!(decode_slot(0b100101), (3, 4));
}

#[test]
fn smaller_items_fill_the_next_free_quadrant() {
    let sizes = [(512, 512), (512, 512), (256, 256), (256, 256), (256, 256), (256, 256)];
    let layout = Pow2Packer::pack(1024, 1024, &sizes).expect("pack");
    let pos: Vec<(u32, u32)> = layout.rects.iter().map(|r| (r.x, r.y)).collect();
    assert_eq!(
        pos,
        vec![(0, 0), (512, 0), (0, 512), (256, 512), (0, 768), (256, 768)]
    );
    assert!(disjoint(&layout.rects));
}

#[test]
fn mixed_sizes_stay_disjoint() {
    let sizes = [
        (512, 512),
        (256, 256),
        (256, 256),
        (128, 128),
        (128, 128),
        (128, 128),
        (64, 64),
        (32, 32),
        (32, 32),
    ];
    let layout = Pow2Packer::pack(1024, 1024, &sizes).expect("pack");
    assert!(disjoint(&layout.rects));
    let page = PixelRect::new(0, 0, 1024, 1024);
    assert!(layout.rects.iter().all(|r| page.contains(r)));
}

#[test]
fn free_slots_track_consumed_cells() {
    let mut packer = Pow2Packer::new(1024, 1024).expect("packer");
    assert_eq!(packer.dimensions(), (1024, 1024));
    assert_eq!(packer.free_slots(), 1);
    packer.place(0, 512, 512).expect("place");
    assert_eq!(packer.free_slots(), 3);
    packer.place(1, 256, 256).expect("place");
    // one 512 cell = four 256 cells, plus the one just taken
    assert_eq!(packer.free_slots(), 16 - 5);
    assert!(packer.warnings().is_empty());
}

#[test]
fn non_square_and_non_pow2_warn_but_place() {
    let layout = Pow2Packer::pack(2048, 2048, &[(1024, 512), (600, 600)]).expect("pack");
    assert_eq!(layout.rects.len(), 2);
    assert!(layout
        .warnings
        .contains(&Pow2Warning::NonSquare { index: 0, w: 1024, h: 512 }));
    assert!(layout
        .warnings
        .contains(&Pow2Warning::NotPowerOfTwo { index: 1, side: 600 }));
    assert!(disjoint(&layout.rects));
}

#[test]
fn unsorted_input_warns_and_rounds_cursor_up() {
    let layout = Pow2Packer::pack(1024, 1024, &[(256, 256), (512, 512)]).expect("pack");
    assert_eq!(
        layout.warnings,
        vec![Pow2Warning::Unsorted {
            index: 1,
            side: 512,
            previous: 256
        }]
    );
    assert_eq!((layout.rects[1].x, layout.rects[1].y), (512, 0));
    assert!(disjoint(&layout.rects));
}

#[test]
fn atlas_shape_is_reported() {
    let layout = Pow2Packer::pack(1024, 512, &[(256, 256)]).expect("pack");
    assert_eq!(
        layout.warnings,
        vec![Pow2Warning::AtlasShape {
            width: 1024,
            height: 512
        }]
    );
}

#[test]
fn out_of_space() {
    assert!(matches!(
        Pow2Packer::pack(1024, 1024, &[(2048, 2048)]),
        Err(AtlasError::OutOfSpace)
    ));
    assert!(matches!(
        Pow2Packer::pack(1024, 1024, &[(512, 512); 5]),
        Err(AtlasError::OutOfSpace)
    ));
}

#[test]
fn regions_are_sorted_before_placement() {
    let mut regions = vec![
        Region::new("small".to_string(), 512.0, 512.0),
        Region::new("big".to_string(), 1024.0, 1024.0),
        Region::new("small2".to_string(), 512.0, 512.0),
    ];
    let report = pack_power_of_two(&mut regions, &pixels()).expect("pack");
    assert!(report.warnings.is_empty());
    assert_eq!((regions[1].x, regions[1].y), (0.0, 0.0));
    assert_eq!((regions[0].x, regions[0].y), (1024.0, 0.0));
    assert_eq!((regions[2].x, regions[2].y), (1536.0, 0.0));
}

#[test]
fn relative_units_round_trip_through_pixels() {
    let mut regions: Vec<Region> = (0..4)
        .map(|i| Region::new(format!("q{}", i), 0.5, 0.5))
        .collect();
    let cfg = PackConfig::builder()
        .strategy(Strategy::PowerOfTwo)
        .with_atlas_dimensions(2048, 2048)
        .build();
    pack(&mut regions, &cfg).expect("pack");
    let pos: Vec<(f64, f64)> = regions.iter().map(|r| (r.x, r.y)).collect();
    assert_eq!(pos, vec![(0.0, 0.0), (0.5, 0.0), (0.0, 0.5), (0.5, 0.5)]);
}

#[test]
fn strict_mode_rejects_without_mutation() {
    let original = vec![
        Region::new("a".to_string(), 1024.0, 512.0).at(3.0, 4.0),
        Region::new("b".to_string(), 512.0, 512.0).at(5.0, 6.0),
    ];
    let mut regions = original.clone();
    let cfg = PackConfig {
        strict_pow2: true,
        ..pixels()
    };
    match pack_power_of_two(&mut regions, &cfg) {
        Err(AtlasError::PreconditionViolated(w)) => {
            assert_eq!(w, vec![Pow2Warning::NonSquare { index: 0, w: 1024, h: 512 }]);
        }
        other => panic!("Expected PreconditionViolated, got {:?}", other),
    }
    assert_eq!(regions, original);

    // lenient mode places them and reports the warning
    let report = pack_power_of_two(&mut regions, &pixels()).expect("pack");
    assert_eq!(report.warnings.len(), 1);
    assert_eq!((regions[0].x, regions[0].y), (0.0, 0.0));
}

#[test]
fn margins_do_not_shift_quadtree_cells() {
    let sizes = [1024.0, 512.0, 512.0];
    let place = |margin: f64| {
        let mut regions: Vec<Region> = sizes
            .iter()
            .enumerate()
            .map(|(i, &s)| {
                let r = Region::new(format!("m{}", i), s, s);
                if i == 2 { r.with_margin(Margin::uniform(4.0)) } else { r }
            })
            .collect();
        let cfg = PackConfig { margin, ..pixels() };
        pack_power_of_two(&mut regions, &cfg).expect("pack");
        regions.iter().map(|r| (r.x, r.y)).collect::<Vec<_>>()
    };
    assert_eq!(place(8.0), place(0.0));
    assert_eq!(place(8.0), vec![(0.0, 0.0), (1024.0, 0.0), (1536.0, 0.0)]);
}
