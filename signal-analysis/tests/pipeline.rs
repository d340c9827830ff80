use assert_approx_eq::assert_approx_eq;
use signal_analysis::{
    BackgroundSource, BuiltinModel, CurveFitEngine, ExportSelection, FitRequest, ParseSettings,
    SignalGroup, TraceStore, formats::timedrive::read_time_drive,
};
use std::{env, fs};

const SAMPLES: usize = 1200;
const FLASHES: [usize; 2] = [200, 600];
const DECAY_RATE: f64 = 0.1;

/// A 10 Hz time drive with a baseline of 1 RLU and two decaying flashes.
fn time_drive_text() -> String {
    let mut text = String::from("Luminometer export\nGain 1\n#DATA\n");
    for i in 0..SAMPLES {
        let t = i as f64 * 0.1;
        let light: f64 = FLASHES
            .iter()
            .filter(|&&onset| i >= onset)
            .map(|&onset| 100.0 * (-DECAY_RATE * (i - onset) as f64 * 0.1).exp())
            .sum();
        text.push_str(&format!("{t:.1}\t{}\n", 1.0 + light));
    }
    text
}

fn parse_group() -> SignalGroup {
    let trace = read_time_drive("flashes.td", time_drive_text().as_bytes()).unwrap();
    let mut store = TraceStore::new(ParseSettings::default());
    store.insert(trace);
    assert!(store.update_signals("flashes.td").unwrap().is_empty());

    let background = store.background("flashes.td").unwrap();
    assert_eq!(background.source, BackgroundSource::Window);
    assert_approx_eq!(background.value, 1.0);

    SignalGroup::from_signals(
        store.signals("flashes.td").unwrap().to_vec(),
        "flashes.parsed",
        "two flashes",
    )
    .unwrap()
}

#[test]
fn signals_extracted_at_flashes() {
    let group = parse_group();
    let names: Vec<_> = group.names().collect();
    assert_eq!(names, vec!["flashes.td 1", "flashes.td 2"]);
    let first = group.get("flashes.td 1").unwrap();
    assert_approx_eq!(first.start(), 20.0);
    assert_eq!(first.samples().len(), 400);
    assert_approx_eq!(first.peak_height(), 100.0);
    assert_approx_eq!(group.get_at(1).unwrap().start(), 60.0);
}

#[test]
fn fit_save_and_reload() {
    let mut group = parse_group();
    let request = FitRequest::builtin(BuiltinModel::Exponential).with_initial("I, 1, .05");
    let failures = group.fit_all(&request, &CurveFitEngine::new());
    assert!(failures.is_empty());
    let fit = group.get("flashes.td 1").unwrap().fit().unwrap();
    assert_approx_eq!(fit.get("k").unwrap(), DECAY_RATE, 1e-4);
    assert_approx_eq!(fit.get("b").unwrap(), 1.0, 1e-4);

    let directory = env::temp_dir();
    let path = group.save(&directory).unwrap();
    let reloaded = SignalGroup::load(&path).unwrap();
    fs::remove_file(&path).unwrap();

    assert_eq!(reloaded.filename(), "flashes.parsed");
    assert_eq!(reloaded.notes(), "two flashes");
    assert_eq!(reloaded.len(), group.len());
    for (saved, loaded) in group.iter().zip(reloaded.iter()) {
        assert_eq!(loaded.name(), saved.name());
        assert_approx_eq!(loaded.start(), saved.start());
        assert_eq!(loaded.samples(), saved.samples());
        let (saved_fit, loaded_fit) = (saved.fit().unwrap(), loaded.fit().unwrap());
        assert_eq!(loaded_fit.parameters, saved_fit.parameters);
        assert_eq!(loaded_fit.estimates, saved_fit.estimates);
        assert_eq!(loaded_fit.curve, saved_fit.curve);
        assert!(loaded_fit.covariance.is_none());
    }
}

#[test]
fn export_columns() {
    let mut group = parse_group();
    let request = FitRequest::builtin(BuiltinModel::Exponential).with_initial("I, 1, .05");
    group
        .fit_signal("flashes.td 1", &request, &CurveFitEngine::new())
        .unwrap();

    let mut buffer = Vec::new();
    let selection = ExportSelection {
        normal: true,
        integrated: false,
        fit: true,
    };
    group.signals_to_csv(selection, &mut buffer).unwrap();
    let text = String::from_utf8(buffer).unwrap();
    let first_row = text.lines().next().unwrap();
    // the second signal has no fit, so three pairs of columns
    assert_eq!(first_row.split(',').count(), 6);
    assert!(first_row.starts_with("flashes.td 1,"));

    let mut buffer = Vec::new();
    group.parameters_to_csv(&mut buffer).unwrap();
    let text = String::from_utf8(buffer).unwrap();
    let rows: Vec<_> = text.lines().collect();
    assert_eq!(rows[0], "name,filename,a,b,k,p");
    assert_eq!(rows.len(), 2);
    assert!(rows[1].starts_with("flashes.td 1,flashes.td,"));
}
