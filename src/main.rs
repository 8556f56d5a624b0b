use eframe::egui;

use netmap::diagram::{NetmapOptions, NodeClick};
use netmap::graph_utils::sample;
use netmap::gui::frontend::NetmapApp;

fn main() -> eframe::Result {
    env_logger::init();

    let clusters = sample::sample_clusters().expect("embedded sample dataset must parse");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1300.0, 710.0])
            // Keep the UI usable on small screens
            .with_min_inner_size([700.0, 420.0])
            .with_resizable(true),
        ..Default::default()
    };
    eframe::run_native(
        "Netmap",
        options,
        Box::new(move |_cc| {
            let opts = NetmapOptions {
                on_node_click: Some(Box::new(|click: NodeClick| {
                    log::info!("node clicked: {} ({})", click.node.name, click.node.id);
                })),
                ..NetmapOptions::default()
            };
            Ok(Box::new(NetmapApp::new(clusters, opts)) as Box<dyn eframe::App>)
        }),
    )
}
