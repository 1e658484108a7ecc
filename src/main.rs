// SPDX: CC0-1.0

use anyhow::Context;
use chrono::{DateTime, Local};
use curve_plot::{
    curve::{self, CurveErr, CurveErrTyp, CurveSet, Outcome},
    eval::{EvalErrTyp, Ident, Idents},
    file,
    lex::{LexErrTyp, SubStr, TokTyp},
    namespace,
    parse::{self, ParseErr, ParseErrTyp},
    shell::{self, Command},
    Number, XRange,
};
#[cfg(not(debug_assertions))]
use std::process::Stdio;
use std::{
    fs::OpenOptions,
    io::{stdout, BufWriter, Write},
    path::PathBuf,
    process::{self, Child, ExitCode},
    sync::Arc,
};

const OUTPUT_RES: [u32; 2] = [1920, 1080];

fn output_svg_filename(now: DateTime<Local>) -> String {
    format!(
        "{}_output-{}.{}",
        env!("CARGO_PKG_NAME"),
        now.format("%Y-%m-%d_%H-%M-%S"),
        "svg"
    )
}

fn output_gnuplot_filename(now: DateTime<Local>) -> String {
    format!(
        "{}_output-{}.{}",
        env!("CARGO_PKG_NAME"),
        now.format("%Y-%m-%d_%H-%M-%S"),
        "gnuplot"
    )
}

fn output_data_filename(now: DateTime<Local>) -> String {
    format!(
        "{}_output-{}.{}",
        env!("CARGO_PKG_NAME"),
        now.format("%Y-%m-%d_%H-%M-%S"),
        "data"
    )
}

fn main() -> ExitCode {
    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("unexpected error: {err}");
            let chain = err.chain();
            if chain.len() > 1 {
                eprintln!();
                eprintln!("context:");
                for it in chain.skip(1) {
                    eprintln!("  {it}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug)]
struct State {
    curves: CurveSet,
    idents: Idents,
    range: XRange,
    filename: Option<PathBuf>,
    gnuplot: Option<Child>,
}

fn try_main() -> anyhow::Result<()> {
    let mut state = State {
        curves: {
            let mut curves = CurveSet::new();
            curves.push(String::new());
            curves
        },
        idents: namespace::sandbox(),
        range: XRange::default(),
        filename: None,
        gnuplot: None,
    };

    let mut stdout = BufWriter::new(stdout());

    if let Some(path) = std::env::args().nth(1) {
        load_file(&mut stdout, &mut state, PathBuf::from(path))?;
    }

    loop {
        match &state.filename {
            Some(path) => writeln!(
                stdout,
                "{} - {} curve(s)",
                path.display(),
                state.curves.len()
            )?,
            None => writeln!(stdout, "(untitled) - {} curve(s)", state.curves.len())?,
        }

        let mut try_cmd = shell::input(&mut stdout, "> ")?;
        try_cmd.make_ascii_lowercase();
        writeln!(stdout)?;

        if let Ok(cmd) = try_cmd.parse::<Command>() {
            match cmd {
                Command::Help => {
                    for c in Command::exhaustive() {
                        writeln!(stdout, "{name}: {help}", name = c.name(), help = c.help())?;
                    }
                }

                Command::Quit => break,

                Command::New => new_document(&mut stdout, &mut state)?,

                Command::Open => open_file(&mut stdout, &mut state)?,

                Command::Save => save_file(&mut stdout, &mut state, false)?,

                Command::SaveAs => save_file(&mut stdout, &mut state, true)?,

                Command::Add => add_curve(&mut stdout, &mut state)?,

                Command::Edit => edit_curve(&mut stdout, &mut state)?,

                Command::Del => del_curve(&mut stdout, &mut state)?,

                Command::List => list_curves(&mut stdout, &state)?,

                Command::Range => set_range(&mut stdout, &mut state)?,

                Command::Plot => plot_curves(&mut stdout, &mut state)?,

                Command::PrintProg => print_progs(&mut stdout, &state)?,
            }
        } else {
            writeln!(stdout, r#"Unknown command, try "help" for help"#)?;
        }

        writeln!(stdout)?;
    }
    stdout.flush()?;
    Ok(())
}

fn new_document<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    state.curves.clear();
    state.curves.push(String::new());
    state.range = XRange::default();
    state.filename = None;
    writeln!(out, "new document")?;
    Ok(())
}

fn load_file<W: Write>(mut out: W, state: &mut State, path: PathBuf) -> anyhow::Result<()> {
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) => {
            writeln!(out, "error: failed to read {}: {err}", path.display())?;
            return Ok(());
        }
    };
    match file::parse(&text) {
        Ok(loaded) => {
            state.curves = loaded.curves;
            state.range = loaded.range;
            state.filename = Some(path);
            writeln!(out, "loaded {} curve(s)", state.curves.len())?;
        }
        Err(err) => {
            // the whole load is abandoned, nothing parsed so far is kept
            writeln!(out, "error: the file is invalid ({err}):")?;
            writeln!(out, "  {}", err.line)?;
        }
    }
    Ok(())
}

fn open_file<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let path = shell::input(&mut out, "?path = ")?;
    if path.is_empty() {
        return Ok(());
    }
    load_file(&mut out, state, PathBuf::from(path))
}

fn save_file<W: Write>(mut out: W, state: &mut State, always_ask: bool) -> anyhow::Result<()> {
    let path = match (&state.filename, always_ask) {
        (Some(path), false) => path.clone(),
        _ => {
            let input = shell::input(&mut out, "?path = ")?;
            if input.is_empty() {
                return Ok(());
            }
            PathBuf::from(input)
        }
    };

    let mut buf = Vec::new();
    file::write(&mut buf, &state.curves, &state.range)?;
    match std::fs::write(&path, &buf) {
        Ok(()) => {
            writeln!(out, "saved {}", path.display())?;
            state.filename = Some(path);
        }
        Err(err) => {
            writeln!(out, "error: failed to write {}: {err}", path.display())?;
        }
    }
    Ok(())
}

fn add_curve<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let expr = shell::input(&mut out, format_args!("{} = ", curve::name(state.curves.len())))?;
    state.curves.push(expr);
    Ok(())
}

fn edit_curve<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let Some(nth) = pick_curve(&mut out, state)? else {
        return Ok(());
    };
    writeln!(out, "{} = {}", curve::name(nth), state.curves.get(nth).unwrap())?;
    let expr = shell::input(&mut out, format_args!("new {} = ", curve::name(nth)))?;
    if expr.is_empty() {
        return Ok(());
    }
    state.curves.set(nth, expr);
    Ok(())
}

fn del_curve<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let Some(nth) = pick_curve(&mut out, state)? else {
        return Ok(());
    };
    state.curves.remove(nth).unwrap();
    // names are derived from position, the remaining curves renumber themselves
    writeln!(out, "deleted; {} curve(s) remain", state.curves.len())?;
    Ok(())
}

fn pick_curve<W: Write>(mut out: W, state: &State) -> anyhow::Result<Option<usize>> {
    if state.curves.is_empty() {
        writeln!(out, "error: no curves are defined")?;
        return Ok(None);
    }
    match shell::read_fromstr::<_, usize>(
        &mut out,
        format_args!("?curve number (1-{}) = ", state.curves.len()),
        true,
    )? {
        Ok(Some(n)) if (1..=state.curves.len()).contains(&n) => Ok(Some(n - 1)),
        Ok(Some(n)) => {
            writeln!(out, "error: no curve number {n}")?;
            Ok(None)
        }
        Ok(None) => Ok(None),
        Err(_) => Ok(None),
    }
}

fn list_curves<W: Write>(mut out: W, state: &State) -> anyhow::Result<()> {
    if state.curves.is_empty() {
        writeln!(out, "(no curves)")?;
    }
    for (name, expr) in state.curves.iter() {
        if expr.is_empty() {
            writeln!(out, "{name} = (empty)")?;
        } else {
            writeln!(out, "{name} = {expr}")?;
        }
    }
    writeln!(out, "range = {:#}", state.range)?;
    Ok(())
}

fn set_range<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    writeln!(out, "range = {:#}", state.range)?;
    writeln!(out)?;
    writeln!(out, "note: leave blank to skip")?;

    for (name, dst) in [
        ("x start", &mut state.range.start),
        ("x end", &mut state.range.end),
    ] {
        match shell::read_fromstr::<_, Number>(
            &mut out,
            format_args!("?{name} (is {cur}) = ", cur = *dst),
            true,
        )? {
            Ok(Some(new)) => *dst = new,
            Ok(None) => {}
            Err(_) => return Ok(()),
        }
    }

    writeln!(out, "note: a point count of 0 is bumped to 1")?;
    match shell::read_fromstr::<_, u32>(
        &mut out,
        format_args!("?points (is {cur}) = ", cur = state.range.n_points()),
        true,
    )? {
        Ok(Some(new)) => state.range.set_n_points(new),
        Ok(None) => {}
        Err(_) => return Ok(()),
    }

    writeln!(out, "step = {}", state.range.step())?;
    Ok(())
}

fn print_progs<W: Write>(mut out: W, state: &State) -> anyhow::Result<()> {
    for (name, expr) in state.curves.iter() {
        if expr.trim().is_empty() {
            writeln!(out, "{name}: (empty)")?;
            continue;
        }
        match parse::compile(expr, &state.idents) {
            Ok(prog) => shell::dump_program(&mut out, &prog, format_args!("{name}"))?,
            Err(err) => {
                writeln!(out, "error in {name}:")?;
                report_parse_err(&mut out, &err)?;
            }
        }
    }
    Ok(())
}

fn plot_curves<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let results = curve::evaluate_all(&state.curves, &state.idents, &state.range);

    let mut plotted = Vec::new();
    for result in &results {
        match &result.outcome {
            Outcome::Samples(points) => {
                writeln!(out, "{}: evaluation ok", result.name)?;
                plotted.push((result, points));
            }
            Outcome::Skipped => {}
            Outcome::Fault(err) => report_curve_err(&mut out, state, &result.expr, err)?,
        }
    }

    if plotted.is_empty() {
        writeln!(out, "nothing to plot")?;
        return Ok(());
    }

    // set up gnuplot
    if let Some(mut old_child) = state.gnuplot.take() {
        old_child
            .kill()
            .context("failed to kill previous gnuplot child")?;
    }
    let now = Local::now();
    let data_path = output_data_filename(now);
    let gnuplot_path = output_gnuplot_filename(now);
    let svg_path = output_svg_filename(now);
    let mut data = BufWriter::new(
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&data_path)
            .context("failed to open output data file")?,
    );
    let mut gnuplot = BufWriter::new(
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&gnuplot_path)
            .context("failed to open output gnuplot file")?,
    );

    // one data block per curve, separated by a pair of blank lines
    for (i, (_, points)) in plotted.iter().enumerate() {
        if i > 0 {
            writeln!(data)?;
            writeln!(data)?;
        }
        for point in points.iter() {
            writeln!(data, "{} {}", point.x, point.y)
                .context("failed to write to output data file")?;
        }
    }
    data.flush()?;
    data.get_mut().sync_data()?;
    drop(data);

    writeln!(gnuplot, "reset")?;
    writeln!(gnuplot, "set term push")?;
    // set output info
    let [width, height] = OUTPUT_RES;
    writeln!(gnuplot, "set terminal svg size {width},{height} enhanced")?;
    writeln!(gnuplot, "set output '{svg_path}'")?;

    // set window; y is left to autoscale from the data
    writeln!(
        gnuplot,
        "set xrange[{min}:{max}]",
        min = state.range.start,
        max = state.range.end
    )?;

    // a NaN sample is a gap in the curve, not a point
    writeln!(gnuplot, r#"set datafile missing "NaN""#)?;

    // configure appearence
    writeln!(gnuplot, r#"set title "{data_path}""#)?;
    writeln!(gnuplot, "set title noenhanced")?;

    writeln!(gnuplot, r#"set xlabel "x""#)?;
    writeln!(gnuplot, r#"set ylabel "y""#)?;
    writeln!(gnuplot, "set tics out nomirror")?;

    writeln!(gnuplot, "set key out vertical top right")?;
    writeln!(gnuplot, r#"set key title "Key""#)?;
    writeln!(gnuplot, "set key noenhanced")?;

    write!(gnuplot, "plot ")?;
    for (i, (result, _)) in plotted.iter().enumerate() {
        if i > 0 {
            write!(gnuplot, ", \\\n  ")?;
        }
        write!(
            gnuplot,
            r#"'{data_path}' index {i} using 1:2 with lines title "{name} = {expr}""#,
            name = result.name,
            expr = result.expr,
        )?;
    }
    writeln!(gnuplot)?;

    // display window
    writeln!(gnuplot, "set term pop")?;
    writeln!(gnuplot, "replot")?;

    // done with the file
    gnuplot.flush()?;
    gnuplot.get_mut().sync_data()?;
    drop(gnuplot);

    // spawn gnuplot and provide the path to the file
    let mut cmd = process::Command::new("gnuplot");
    cmd.arg("--persist").arg(&gnuplot_path);
    #[cfg(not(debug_assertions))]
    {
        cmd.stdout(Stdio::null())
            .stderr(Stdio::null())
            .stdin(Stdio::null());
    }
    let child = cmd
        .spawn()
        .context("failed to spawn gnuplot (is it installed and in ${{PATH}}?)")?;

    state.gnuplot = Some(child);

    writeln!(out, "wrote {svg_path}")?;
    Ok(())
}

fn report_curve_err<W: Write>(
    mut out: W,
    state: &State,
    expr: &Arc<String>,
    err: &CurveErr,
) -> anyhow::Result<()> {
    writeln!(out, "error in {}:", err.curve)?;
    match &err.typ {
        CurveErrTyp::Parse(parse_err) => report_parse_err(&mut out, parse_err)?,

        CurveErrTyp::Eval(eval_err) => {
            let loc = eval_err.op.clone().map(|op| op.loc);
            shell::underline(
                &mut out,
                // NOTE(unicode)
                &loc.clone()
                    .unwrap_or(SubStr::new(Arc::clone(expr), expr.len(), 1)),
            )?;
            writeln!(out, "evaluation error: {eval_err}")?;

            if loc.is_none() {
                writeln!(
                    out,
                    "note: exactly 1 final value is expected on the stack after evaluation"
                )?;
            }

            match &eval_err.typ {
                EvalErrTyp::Empty => {}

                EvalErrTyp::MissingArgs { .. } => {}

                EvalErrTyp::StackMismatch { .. } => {
                    writeln!(
                    out,
                    "note: implicit multiplication is not supported, so for example '5x' would be '5*x'",
                )?;
                }

                EvalErrTyp::UndefinedIdent { text } => {
                    let most_similar = state
                        .idents
                        .iter()
                        .map(|(k, v)| {
                            (
                                strsim::normalized_damerau_levenshtein(
                                    // HACK: this is wasteful but that's not important
                                    &text.get().to_ascii_lowercase(),
                                    &k.get().to_ascii_lowercase(),
                                ),
                                (k, v),
                            )
                        })
                        .reduce(|(acc_sim, acc_kv), (elem_sim, elem_kv)| {
                            if elem_sim > acc_sim {
                                (elem_sim, elem_kv)
                            } else {
                                (acc_sim, acc_kv)
                            }
                        });
                    if let Some((sim, (key, ident))) = most_similar {
                        if sim > 0.3 {
                            let ident_typ = match ident {
                                Ident::Const(_) => "constant",
                                Ident::Fun(_) => "function",
                            };
                            writeln!(out, "note: {ident_typ} '{key}' has a similar name")?;
                        }
                    }
                    writeln!(out, "note: the free variable is '{}'", namespace::X)?;
                }
            }
        }

        CurveErrTyp::NoStep(no_step) => {
            writeln!(out, "evaluation error: {no_step}")?;
            writeln!(
                out,
                "note: the step is (end - start) / points, so start and end must differ"
            )?;
        }
    }
    Ok(())
}

fn report_parse_err<W: Write>(mut out: W, err: &ParseErr) -> anyhow::Result<()> {
    writeln!(out)?;
    shell::underline(&mut out, &err.loc)?;
    writeln!(out, "parse error: {}", err.typ)?;
    match &err.typ {
        ParseErrTyp::LexErr(lex_err) => {
            match lex_err {
                LexErrTyp::InvalidChar => {
                    writeln!(
                        out,
                        "note: available tokens are numbers, alphabetic identifiers, and symbols +-*/^,()"
                    )?;
                }
                LexErrTyp::Unsupported(typ) => match typ {
                    TokTyp::Ident
                    | TokTyp::Number
                    | TokTyp::Op(_)
                    | TokTyp::Comma
                    | TokTyp::OpenParen
                    | TokTyp::CloseParen => unreachable!(),

                    TokTyp::XGreater | TokTyp::XLess => {
                        writeln!(out, "note: expected an expression but found an inequality")?;
                    }
                    TokTyp::XEqual => {
                        writeln!(out, "note: expected an expression but found an equation")?;
                    }
                    TokTyp::XPipe => writeln!(
                        out,
                        "note: use the 'abs' function to compute absolute value"
                    )?,
                    TokTyp::XOpenSquareBracket => {}
                    TokTyp::XCloseSquareBracket => {}
                    TokTyp::XOpenCurly => {}
                    TokTyp::XCloseCurly => {}
                },
            }
        }

        ParseErrTyp::ParseNum(_) => {
            writeln!(out, "note: parsing as floating point number")?
        }

        ParseErrTyp::ParenMismatch => {}
    }
    Ok(())
}
