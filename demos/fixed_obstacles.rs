use stepwise_astar::{PathingGrid, Point, SearchEngine, SearchResult, StepOutcome};

// In this example a path is found on a 3x3 grid with shape
//  ___
// |S  |
// | # |
// |  E|
//  ___
// where
// - # marks an obstacle
// - S marks the start
// - E marks the end
//
// Every step is printed as it happens.

fn main() {
    let start = Point::new(0, 0);
    let end = Point::new(2, 2);
    let grid = PathingGrid::with_obstacles(3, 3, start, end, vec![Point::new(1, 1)]).unwrap();
    println!("{}", grid);
    let mut engine = SearchEngine::new();
    engine.start(grid);
    while engine.is_running() {
        match engine.step().unwrap() {
            StepOutcome::Continue(o) => {
                println!("Step {}: expanded {:?}, open {:?}", o.iteration, o.current, o.open);
            }
            StepOutcome::Finished { result, .. } => match result {
                SearchResult::Solved { path, cost } => {
                    println!("Path (cost {:.1}):", cost);
                    for p in path {
                        println!("{:?}", p);
                    }
                }
                SearchResult::Unsolvable(reason) => println!("No path: {:?}", reason),
            },
        }
    }
}
