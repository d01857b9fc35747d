use super::*;
use crate::document::observer::RecordingObserver;
use crate::layers::layer::{BlendMode, PixelBuffer};

fn spec() -> DocumentSpec {
    DocumentSpec {
        width: 16,
        height: 16,
        first_layer: "Background".into(),
        ..DocumentSpec::default()
    }
}

fn opts() -> EditorOpts {
    EditorOpts {
        history_capacity: 8,
        ..EditorOpts::default()
    }
}

fn doc() -> (Document, RecordingObserver) {
    let mut d = Document::new(&spec(), opts()).unwrap();
    let rec = RecordingObserver::new();
    d.set_observer(rec.clone());
    (d, rec)
}

fn names(d: &Document) -> Vec<String> {
    d.layers().iter().map(|l| l.name().to_string()).collect()
}

#[test]
fn new_document_has_one_selected_layer() {
    let (d, _) = doc();
    assert_eq!(names(&d), ["Background"]);
    assert_eq!(d.active_layer(), d.layers().bottom());
    assert_eq!(d.active_group(), None);
    assert!(!d.is_dirty());
    assert_eq!(d.history().capacity(), 8);
}

#[test]
fn add_and_remove_are_undoable_and_notified() {
    let (mut d, rec) = doc();
    let bg = d.layers().bottom().unwrap();
    let px = PixelBuffer::new(4, 4, 4).unwrap();
    let id = d.add_layer(NewLayer::raster("Layer 1", px, 2, 3), Some(bg)).unwrap();
    assert_eq!(d.active_layer(), Some(id));
    assert_eq!(rec.rects(), [PixelRect::new(2, 3, 4, 4)]);

    d.remove_layer(id).unwrap();
    assert_eq!(names(&d), ["Background"]);
    assert_eq!(d.active_layer(), Some(bg));

    assert_eq!(d.undo().unwrap().as_deref(), Some("Delete Layer Layer 1"));
    assert_eq!(names(&d), ["Background", "Layer 1"]);
    assert_eq!(d.undo().unwrap().as_deref(), Some("New Layer Layer 1"));
    assert_eq!(names(&d), ["Background"]);
    assert!(d.undo().unwrap().is_none());
    d.redo().unwrap();
    assert!(d.layers().contains(id));
    assert_eq!(rec.rects().len(), 5);
    assert!(d.is_dirty());
}

#[test]
fn last_layer_cannot_be_removed() {
    let (mut d, rec) = doc();
    let bg = d.layers().bottom().unwrap();
    assert!(matches!(d.remove_layer(bg), Err(LayerdocError::Validation(_))));
    assert_eq!(d.history().rest_undo(), 0);
    assert!(rec.rects().is_empty());
}

#[test]
fn edit_region_clamps_and_round_trips() {
    let (mut d, rec) = doc();
    let bg = d.layers().bottom().unwrap();
    let before = d.layers().layer(bg).unwrap().pixels().unwrap().clone();

    let edited = d
        .edit_region(bg, PixelRect::new(12, 12, 10, 10), "Fill", |r| r.fill(&[1, 2, 3, 4]))
        .unwrap();
    assert!(edited);
    assert_eq!(rec.rects(), [PixelRect::new(12, 12, 4, 4)]);
    let after = d.layers().layer(bg).unwrap().pixels().unwrap().clone();
    assert_eq!(after.pixel(15, 15), Some(&[1u8, 2, 3, 4][..]));

    d.undo().unwrap();
    assert_eq!(d.layers().layer(bg).unwrap().pixels(), Some(&before));
    d.redo().unwrap();
    assert_eq!(d.layers().layer(bg).unwrap().pixels(), Some(&after));

    let outside = d
        .edit_region(bg, PixelRect::new(40, 0, 4, 4), "Nothing", |r| r.fill(&[9; 4]))
        .unwrap();
    assert!(!outside);
    assert_eq!(d.history().rest_undo(), 1);
}

#[test]
fn failed_edit_restores_pixels() {
    let (mut d, _) = doc();
    let bg = d.layers().bottom().unwrap();
    let before = d.layers().layer(bg).unwrap().pixels().unwrap().clone();
    let res = d.edit_region(bg, PixelRect::from_size(4, 4), "Broken", |r| {
        r.fill(&[7; 4])?;
        Err(LayerdocError::validation("brush failed"))
    });
    assert!(res.is_err());
    assert_eq!(d.layers().layer(bg).unwrap().pixels(), Some(&before));
    assert_eq!(d.history().rest_undo(), 0);
}

#[test]
fn params_rename_visibility_and_moves_are_undoable() {
    let (mut d, _) = doc();
    let bg = d.layers().bottom().unwrap();
    let g = d
        .add_layer(NewLayer::group("Folder", PixelRect::from_size(16, 16)), Some(bg))
        .unwrap();
    let a = d
        .add_layer(NewLayer::raster("a", PixelBuffer::new(2, 2, 4).unwrap(), 0, 0), Some(g))
        .unwrap();
    assert_eq!(d.active_group(), Some(g));

    d.rename_layer(a, "ink").unwrap();
    d.set_visible(a, false).unwrap();
    let mut p = d.layers().layer(a).unwrap().params();
    p.blend = BlendMode::Overlay;
    d.set_layer_params(a, p).unwrap();
    assert!(d.rename_layer(a, "Folder").is_err());

    d.move_layer_in(g, None, None).unwrap();
    assert_eq!(names(&d), ["Folder", "ink", "Background"]);

    d.undo().unwrap();
    assert_eq!(names(&d), ["Background", "Folder", "ink"]);
    d.undo().unwrap();
    assert_eq!(d.layers().layer(a).unwrap().blend(), BlendMode::Normal);
    d.undo().unwrap();
    assert!(d.layers().layer(a).unwrap().is_visible());
    d.undo().unwrap();
    assert_eq!(d.layers().layer(a).unwrap().name(), "a");
}

#[test]
fn set_active_tracks_enclosing_group() {
    let (mut d, _) = doc();
    let bg = d.layers().bottom().unwrap();
    let g = d
        .add_layer(NewLayer::group("Folder", PixelRect::from_size(16, 16)), Some(bg))
        .unwrap();
    let a = d
        .add_layer(NewLayer::raster("a", PixelBuffer::new(2, 2, 4).unwrap(), 0, 0), Some(g))
        .unwrap();
    d.set_active(bg).unwrap();
    assert_eq!(d.active_group(), None);
    d.set_active(a).unwrap();
    assert_eq!(d.active_group(), Some(g));
    assert!(d.set_active(LayerId(99)).is_err());
}

#[test]
fn bytes_round_trip_and_clean_after_save() {
    let (mut d, _) = doc();
    let bg = d.layers().bottom().unwrap();
    d.edit_region(bg, PixelRect::new(0, 0, 3, 3), "Dot", |r| r.fill(&[0, 0, 0, 255]))
        .unwrap();
    d.meta_mut().resolution = Some(144);

    let bytes = d.to_bytes().unwrap();
    let (back, report) = Document::from_bytes(&bytes, opts()).unwrap();
    assert!(report.is_clean());
    assert_eq!(names(&back), names(&d));
    assert_eq!(back.canvas().meta.resolution, Some(144));
    assert_eq!(
        back.layers().layer(back.layers().bottom().unwrap()).unwrap().pixels(),
        d.layers().layer(bg).unwrap().pixels()
    );
    assert_eq!(back.history().rest_undo(), 0);
    assert!(!back.is_dirty());
}

#[test]
fn thumbnail_follows_options() {
    let (mut d, _) = doc();
    let composite = ImagePixels::from_buffer(d.canvas().background());
    let small = EditorOpts {
        thumbnail_max_side: 4,
        ..opts()
    };
    d.opts = small;
    d.update_thumbnail(&composite).unwrap();
    let t = d.canvas().thumbnail().unwrap();
    assert_eq!((t.width, t.height), (4, 4));

    d.opts.thumbnail_max_side = 0;
    d.update_thumbnail(&composite).unwrap();
    assert!(d.canvas().thumbnail().is_none());
}

#[test]
fn bad_options_are_rejected() {
    let bad = EditorOpts {
        history_capacity: 0,
        ..EditorOpts::default()
    };
    assert!(Document::new(&spec(), bad).is_err());
}
