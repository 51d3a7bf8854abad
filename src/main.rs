use std::path::Path;

use opset_graph::config::GraphConfig;
use opset_graph::opsets::opset6;
use opset_graph::registry::{self, NodeFactory};
use opset_graph::{DType, Graph, NodeInput, Shape};

/// Lists the operators of every opset. With a config file argument, also
/// builds a small decoding graph under that config and dumps it as JSON.
fn main() -> anyhow::Result<()> {
    env_logger::init();

    let registry = registry::global()?;
    for opset in registry.opsets() {
        println!("{} ({} operators): {}", opset.version(), opset.len(), opset.operator_names().join(", "));
    }

    let Some(path) = std::env::args().nth(1) else {
        return Ok(());
    };
    let config = GraphConfig::from_json_file(Path::new(&path))?;
    log::info!("Loaded {:?} from {}", config, path);

    let mut graph = Graph::with_config(config);
    let logits = opset6::parameter(&mut graph, Shape::from_raw(&[1, -1, 29])?, DType::F32, Some("logits"))?;
    let lengths = opset6::parameter(&mut graph, Shape::from_raw(&[1])?, DType::I32, Some("lengths"))?;
    let probs = opset6::softmax(&mut graph, logits, Some(2), None)?;
    opset6::ctc_greedy_decoder_seq_len(&mut graph, probs, lengths, NodeInput::Absent, None, None, None, Some("decoded"))?;

    println!("{}", serde_json::to_string_pretty(&graph)?);
    Ok(())
}
