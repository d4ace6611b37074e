use cordyceps_avl::AvlSet;
use log::{info, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

fn main() {
    if let Err(err) = TermLogger::init(
        LevelFilter::Trace,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("logging disabled: {err}");
    }

    let mut set: AvlSet<u32> = AvlSet::new();

    for key in [10, 20, 30, 5, 15, 25, 35, 40] {
        info!("inserting {key}");
        set.insert(key);
        set.check_invariants().expect("insert left the tree unbalanced");
        info!(
            "preorder {:?}, height {}",
            set.preorder().collect::<Vec<_>>(),
            set.height()
        );
    }

    for key in [20, 5, 10] {
        info!("removing {key}");
        set.remove(&key);
        set.check_invariants().expect("remove left the tree unbalanced");
        info!(
            "preorder {:?}, height {}",
            set.preorder().collect::<Vec<_>>(),
            set.height()
        );
    }

    let mut graph = String::new();
    set.dotgraph("demo", &mut graph)
        .expect("writing to a String cannot fail");
    println!("{graph}");
}
