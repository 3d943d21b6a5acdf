// OpenFst text format compiler and printer.
//
// Symbol files hold one `symbol label` pair per line. FST files hold one arc
// (`src dst ilabel olabel [weight]`) or final state (`state [weight]`) per
// line, with labels written as symbol strings. The source of the first line
// is the start state.

use std::path::Path;

use crate::model::FstModel;
use crate::symbols::{SymbolTable, SymbolTableBuilder};
use crate::weighted::FstBuilder;
use crate::{Label, LoadError, StateId, Weight};

/// Parse a symbol file (`symbol label` per line; blank lines ignored).
pub fn parse_symbols(text: &str) -> Result<SymbolTable, LoadError> {
    let mut builder = SymbolTableBuilder::new();
    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            [] => continue,
            [symbol, id] => {
                let id: Label = id.parse().map_err(|_| LoadError::Syntax {
                    line: line_no,
                    message: format!("invalid label {id:?}"),
                })?;
                builder.insert(symbol, id)?;
            }
            _ => {
                return Err(LoadError::Syntax {
                    line: line_no,
                    message: format!("expected `symbol label`, found {line:?}"),
                });
            }
        }
    }
    builder.build()
}

/// Compile an FST in text form against existing symbol tables.
pub fn compile(
    fst_text: &str,
    input_symbols: SymbolTable,
    output_symbols: SymbolTable,
) -> Result<FstModel, LoadError> {
    let mut builder = FstBuilder::new();
    let mut start: Option<StateId> = None;

    // Each line names at most two states, so no valid state id reaches this.
    let state_limit = fst_text.lines().filter(|l| is_content(l)).count() * 2;

    for (i, line) in fst_text.lines().enumerate() {
        let line_no = i + 1;
        if !is_content(line) {
            continue;
        }
        let trimmed = line.trim();
        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        match fields.as_slice() {
            [state] | [state, _] => {
                let state = parse_state(state, state_limit, line_no)?;
                let weight = match fields.get(1) {
                    Some(w) => parse_weight(w, line_no)?,
                    None => 0.0,
                };
                start.get_or_insert(state);
                builder.set_final(state, weight);
            }
            [src, dst, isym, osym] | [src, dst, isym, osym, _] => {
                let src = parse_state(src, state_limit, line_no)?;
                let dst = parse_state(dst, state_limit, line_no)?;
                let ilabel = resolve(&input_symbols, isym, "input", line_no)?;
                let olabel = resolve(&output_symbols, osym, "output", line_no)?;
                let weight = match fields.get(4) {
                    Some(w) => parse_weight(w, line_no)?,
                    None => 0.0,
                };
                start.get_or_insert(src);
                builder.ensure_state(src.max(dst));
                builder.add_arc(src, dst, ilabel, olabel, weight);
            }
            _ => {
                return Err(LoadError::Syntax {
                    line: line_no,
                    message: format!("expected 1, 2, 4 or 5 fields, found {}", fields.len()),
                });
            }
        }
    }

    let Some(start) = start else {
        return Err(LoadError::Syntax {
            line: 0,
            message: "FST text contains no states".to_string(),
        });
    };
    builder.set_start(start);
    FstModel::new(input_symbols, output_symbols, builder.build()?)
}

/// Read the three text files and compile them into a model.
pub fn compile_files(
    fst_path: &Path,
    input_symbols_path: &Path,
    output_symbols_path: &Path,
) -> Result<FstModel, LoadError> {
    let input_symbols = parse_symbols(&read_text(input_symbols_path)?)?;
    let output_symbols = parse_symbols(&read_text(output_symbols_path)?)?;
    compile(&read_text(fst_path)?, input_symbols, output_symbols)
}

/// Print a symbol table in symbol-file form.
pub fn print_symbols(symbols: &SymbolTable) -> String {
    let mut out = String::new();
    for (id, symbol) in symbols.iter() {
        out.push_str(symbol);
        out.push('\t');
        out.push_str(&id.to_string());
        out.push('\n');
    }
    out
}

/// Print the FST with symbolic labels. The start state's lines come first so
/// the output compiles back to the same start state.
pub fn print_fst(model: &FstModel) -> String {
    let fst = model.fst();
    let start = fst.start_state();
    let order = std::iter::once(start).chain(fst.states().filter(|&s| s != start));

    let mut out = String::new();
    for state in order {
        for arc in fst.arcs(state) {
            let isym = model.input_symbols().symbol_of(arc.ilabel).unwrap_or_default();
            let osym = model.output_symbols().symbol_of(arc.olabel).unwrap_or_default();
            out.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\n",
                arc.source, arc.target, isym, osym, arc.weight
            ));
        }
        if let Some(weight) = fst.final_weight(state) {
            out.push_str(&format!("{state}\t{weight}\n"));
        }
    }
    out
}

fn read_text(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => LoadError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => LoadError::Io(e),
    })
}

fn is_content(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#')
}

fn parse_state(field: &str, limit: usize, line: usize) -> Result<StateId, LoadError> {
    let state: StateId = field.parse().map_err(|_| LoadError::Syntax {
        line,
        message: format!("invalid state {field:?}"),
    })?;
    if state as usize >= limit {
        return Err(LoadError::Syntax {
            line,
            message: format!("state {state} out of range (at most {limit} states)"),
        });
    }
    Ok(state)
}

fn parse_weight(field: &str, line: usize) -> Result<Weight, LoadError> {
    field.parse().map_err(|_| LoadError::Syntax {
        line,
        message: format!("invalid weight {field:?}"),
    })
}

fn resolve(table: &SymbolTable, symbol: &str, side: &str, line: usize) -> Result<Label, LoadError> {
    table.id_of(symbol).ok_or_else(|| LoadError::Syntax {
        line,
        message: format!("unknown {side} symbol {symbol:?}"),
    })
}
