use js_sys::Float64Array;
use serde::Serialize;
use serde_wasm_bindgen as swb;
use wasm_bindgen::prelude::*;

use salient_core::{
    default_max_keyframes, export_selections_json, reduce, select_set, select_with_config,
    CommandArg, ReduceCommand, SelectCommand, SelectConfig, REDUCE_COMMAND, SELECT_COMMAND,
};

fn jsvalue_is_undefined_or_null(v: &JsValue) -> bool {
    v.is_undefined() || v.is_null()
}

fn select_config(config: JsValue) -> Result<SelectConfig, JsError> {
    if jsvalue_is_undefined_or_null(&config) {
        Ok(SelectConfig::default())
    } else {
        swb::from_value(config).map_err(|e| JsError::new(&format!("config error: {e}")))
    }
}

/// Select keyframes over `[start, end]` and return the text report, one line
/// per keyframe count: `"<error>|<offset>,<offset>,..."`.
///
/// `data` is the frame-major sample matrix. `config` is optional JSON matching
/// SelectConfig, e.g. `{ metric: "line", fixed_keyframes: [12] }`.
#[wasm_bindgen(js_name = salientSelect)]
pub fn salient_select(
    start: i32,
    end: i32,
    max_keyframes: u32,
    data: Vec<f64>,
    config: JsValue,
) -> Result<String, JsError> {
    console_error_panic_hook::set_once();
    let cfg = select_config(config)?;
    select_with_config(
        i64::from(start),
        i64::from(end),
        max_keyframes as usize,
        &data,
        &cfg,
    )
    .map_err(|e| JsError::new(&format!("{SELECT_COMMAND}: {e}")))
}

/// Like `salientSelect`, returning `{ start, results: [{ keyframes, error, selection, frames }] }`.
#[wasm_bindgen(js_name = salientSelectJson)]
pub fn salient_select_json(
    start: i32,
    end: i32,
    max_keyframes: u32,
    data: Vec<f64>,
    config: JsValue,
) -> Result<JsValue, JsError> {
    console_error_panic_hook::set_once();
    let cfg = select_config(config)?;
    let set = select_set(
        i64::from(start),
        i64::from(end),
        max_keyframes as usize,
        &data,
        &cfg,
    )
    .map_err(|e| JsError::new(&format!("{SELECT_COMMAND}: {e}")))?;
    export_selections_json(&set, i64::from(start))
        .serialize(&swb::Serializer::json_compatible())
        .map_err(|e| JsError::new(&format!("selection serialize error: {e}")))
}

/// Fit one cubic per consecutive keyframe pair; 8 numbers per cubic.
#[wasm_bindgen(js_name = salientReduce)]
pub fn salient_reduce(samples: Vec<f64>, keyframes: Vec<u32>) -> Result<Vec<f64>, JsError> {
    console_error_panic_hook::set_once();
    let keyframes: Vec<usize> = keyframes.into_iter().map(|k| k as usize).collect();
    reduce(&samples, &keyframes).map_err(|e| JsError::new(&format!("{REDUCE_COMMAND}: {e}")))
}

/// Run a command by name with positional arguments (a JS array).
/// `salientSelect` yields the report string, `salientReduce` a Float64Array.
#[wasm_bindgen(js_name = runCommand)]
pub fn run_command(name: &str, args: JsValue) -> Result<JsValue, JsError> {
    console_error_panic_hook::set_once();
    let args: Vec<CommandArg> =
        swb::from_value(args).map_err(|e| JsError::new(&format!("{name}: bad arguments: {e}")))?;
    match name {
        SELECT_COMMAND => {
            let report = SelectCommand::from_args(&args)
                .and_then(|cmd| cmd.run())
                .map_err(|e| JsError::new(&e.to_string()))?;
            Ok(JsValue::from_str(&report))
        }
        REDUCE_COMMAND => {
            let flat = ReduceCommand::from_args(&args)
                .and_then(|cmd| cmd.run())
                .map_err(|e| JsError::new(&e.to_string()))?;
            Ok(Float64Array::from(flat.as_slice()).into())
        }
        other => Err(JsError::new(&format!("unknown command '{other}'"))),
    }
}

/// Suggested largest keyframe count for a range of `frames` frames.
#[wasm_bindgen(js_name = defaultMaxKeyframes)]
pub fn default_max_keyframes_js(frames: u32) -> u32 {
    default_max_keyframes(frames as usize) as u32
}

/// Numeric ABI version for compatibility checks at init.
#[wasm_bindgen]
pub fn abi_version() -> u32 {
    1
}
