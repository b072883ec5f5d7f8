use panelkit::compose::{
    ApertureDefinition, CoordStatement, DrillFeature, DrillTool, GerberStatement, ParamStatement,
};
use panelkit::{
    DrawMode, DxfSource, ExcellonSource, FileSettings, GerberComposition, GerberSource,
    PanelConfig, Point, UnitConversion, Units,
};
use std::fs;
use tempfile::tempdir;

fn board_copper() -> GerberSource {
    GerberSource::new(
        FileSettings::for_units(Units::Metric),
        vec![
            GerberStatement::Comment("board copper".into()),
            GerberStatement::Param(ParamStatement::FormatSpec),
            GerberStatement::Param(ParamStatement::Units),
            GerberStatement::Param(ParamStatement::ApertureDefinition(
                ApertureDefinition::rectangle(10, 1.5, 0.8),
            )),
            GerberStatement::SelectAperture(10),
            GerberStatement::Coordinate(CoordStatement::flash(Point::new(5.0, 5.0))),
            GerberStatement::Coordinate(CoordStatement::flash(Point::new(15.0, 5.0))),
            GerberStatement::Eof,
        ],
    )
}

fn board_drill() -> ExcellonSource {
    ExcellonSource::with_tools(
        FileSettings::for_units(Units::Metric),
        vec![DrillTool::new(1, 0.5)],
        vec![
            DrillFeature::Hit {
                tool: 1,
                position: Point::new(5.0, 5.0),
            },
            DrillFeature::Hit {
                tool: 1,
                position: Point::new(15.0, 5.0),
            },
        ],
    )
}

#[test]
fn two_boards_with_frame_and_mouse_bites() {
    let dir = tempdir().unwrap();
    let mut config = PanelConfig::default();
    config.dxf.width_mm = 0.5;

    let mut copper = GerberComposition::new();
    copper.merge(board_copper()).unwrap();
    let mut rotated = board_copper();
    rotated.rotate(90.0, Point::origin()).unwrap();
    rotated.offset(60.0, 0.0);
    copper.merge(rotated).unwrap();

    let mut frame = DxfSource::rectangle(80.0, 30.0, -5.0, -5.0, Units::Metric, DrawMode::Line);
    config.apply_to(&mut frame);
    frame.set_width(0.2);
    copper.merge(frame).unwrap();

    let copper_path = dir.path().join("panel.gtl");
    copper.dump(&copper_path).unwrap();
    let text = fs::read_to_string(&copper_path).unwrap();
    assert!(text.contains("%AMMACR*"));
    assert!(text.contains("%ADD11MACR,1.5X0.8*%"));
    assert_eq!(copper.comments().len(), 2);

    let mut drill = config.drill_composition();
    drill.merge(board_drill()).unwrap();
    let mut second = board_drill();
    second.rotate(90.0, Point::origin());
    second.offset(60.0, 0.0);
    drill.merge(second).unwrap();

    let mut bites = DxfSource::rectangle(10.0, 1.0, 20.0, 2.0, Units::Metric, DrawMode::Line);
    config.dxf.draw_mode = DrawMode::MouseBites;
    config.apply_to(&mut bites);
    let dots = bites.dots().len();
    drill.merge(bites).unwrap();

    assert_eq!(drill.tools().len(), 1);
    assert_eq!(drill.hit_count(1), 4 + dots);

    let drill_path = dir.path().join("panel.drl");
    drill.dump(&drill_path).unwrap();
    let text = fs::read_to_string(&drill_path).unwrap();
    assert!(text.starts_with("M48\n"));
    assert!(text.ends_with("M30\n"));
}

#[test]
fn inch_layers_join_a_metric_panel() {
    let mut copper = GerberComposition::new();
    copper.merge(board_copper()).unwrap();

    let mut inch = board_copper();
    inch.to_inch();
    copper.merge(inch).unwrap();

    let sizes: Vec<f64> = copper.apertures().iter().map(|a| a.modifiers[0]).collect();
    assert!((sizes[0] - sizes[1]).abs() < 1e-9);
    assert_eq!(copper.settings().map(|s| s.units), Some(Units::Metric));
}
