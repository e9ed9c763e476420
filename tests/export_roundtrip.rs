use quiniela_builder::export::{
    PortfolioRecord, parse_tickets_table, read_matches, read_record, tickets_table,
    write_record, write_tickets_table,
};
use quiniela_builder::model::Match;
use quiniela_builder::{PipelineConfig, PortfolioRun, build_portfolio};

fn run() -> PortfolioRun {
    let matches: Vec<Match> = [
        (0.62, 0.23, 0.15),
        (0.45, 0.30, 0.25),
        (0.33, 0.36, 0.31),
        (0.25, 0.28, 0.47),
        (0.66, 0.22, 0.12),
        (0.42, 0.29, 0.29),
        (0.31, 0.37, 0.32),
        (0.50, 0.27, 0.23),
        (0.20, 0.25, 0.55),
        (0.38, 0.30, 0.32),
        (0.44, 0.31, 0.25),
        (0.34, 0.35, 0.31),
        (0.15, 0.20, 0.65),
        (0.48, 0.26, 0.26),
    ]
    .iter()
    .enumerate()
    .map(|(i, (h, d, a))| Match::new(&format!("L{i}"), &format!("V{i}"), *h, *d, *a))
    .collect();
    let cfg = PipelineConfig {
        num_tickets: 9,
        monte_carlo_trials: 400,
        ..PipelineConfig::default()
    };
    build_portfolio(&matches, &cfg, 31).unwrap()
}

#[test]
fn tabular_round_trip_keeps_picks_and_draws() {
    let run = run();
    let parsed = parse_tickets_table(&tickets_table(&run.tickets).unwrap()).unwrap();
    assert_eq!(parsed.len(), run.tickets.len());
    for (a, b) in run.tickets.iter().zip(&parsed) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.kind, b.kind);
        assert_eq!(a.outcomes, b.outcomes);
        assert_eq!(a.draw_count, b.draw_count);
        assert!((a.hit_probability - b.hit_probability).abs() < 1e-9);
    }
}

#[test]
fn files_round_trip() {
    let run = run();
    let dir = tempfile::tempdir().unwrap();

    let table_path = dir.path().join("portfolio.csv");
    write_tickets_table(&table_path, &run.tickets).unwrap();
    let raw = std::fs::read_to_string(&table_path).unwrap();
    let parsed = parse_tickets_table(&raw).unwrap();
    assert_eq!(
        parsed.iter().map(|t| t.symbols()).collect::<Vec<_>>(),
        run.tickets.iter().map(|t| t.symbols()).collect::<Vec<_>>()
    );

    let record_path = dir.path().join("portfolio.json");
    write_record(&record_path, &PortfolioRecord::new(run.clone())).unwrap();
    let back = read_record(&record_path).unwrap();
    assert_eq!(back.run.seed, run.seed);
    assert_eq!(back.run.config, run.config);
    assert_eq!(back.run.matches.len(), 14);
    assert_eq!(back.run.report.is_valid, run.report.is_valid);
    assert_eq!(back.run.report.warnings, run.report.warnings);
    for (a, b) in run.tickets.iter().zip(&back.run.tickets) {
        assert_eq!(a.outcomes, b.outcomes);
        assert_eq!(a.draw_count, b.draw_count);
    }
    assert!(!back.generated_at.is_empty());
}

#[test]
fn csv_slate_with_quoted_names_builds_a_portfolio() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jornada.csv");
    let mut raw = String::from("\"local\",\"visitor\",\"p_local\",\"p_draw\",\"p_visitor\"\n");
    raw.push_str("\"Atletico, San Luis\",Toluca,0.40,0.30,0.30\n");
    for i in 1..14 {
        raw.push_str(&format!("L{i},\"V, {i}\",0.45,0.30,0.25\n"));
    }
    std::fs::write(&path, raw).unwrap();

    let matches = read_matches(&path).unwrap();
    assert_eq!(matches.len(), 14);
    assert_eq!(matches[0].local, "Atletico, San Luis");
    assert_eq!(matches[13].visitor, "V, 13");

    let cfg = PipelineConfig {
        num_tickets: 6,
        monte_carlo_trials: 200,
        ..PipelineConfig::default()
    };
    let run = build_portfolio(&matches, &cfg, 5).unwrap();
    assert_eq!(run.tickets.len(), 6);
}
