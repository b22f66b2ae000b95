use stepwise_astar::{Observation, Point, Scheduler, SearchEvent, SearchRequest, SearchResult};

// Runs a paced search on a random 20x12 grid and redraws it after every step:
// - # obstacle, . unexplored
// - o open, x closed, * best route to the node that was just expanded
//
// Pass a seed as the first argument to get the same grid every time.

fn draw(request: &SearchRequest, blocked: &[Vec<bool>], observation: &Observation) {
    let mut rows = blocked
        .iter()
        .map(|row| {
            row.iter()
                .map(|&b| if b { '#' } else { '.' })
                .collect::<Vec<char>>()
        })
        .collect::<Vec<_>>();
    let mut mark = |p: &Point, c: char| rows[p.y as usize][p.x as usize] = c;
    observation.open.iter().for_each(|p| mark(p, 'o'));
    observation.closed.iter().for_each(|p| mark(p, 'x'));
    observation.best_path.iter().for_each(|p| mark(p, '*'));
    mark(&request.start, 'S');
    mark(&request.goal, 'G');
    println!("Step {}", observation.iteration);
    for row in rows {
        println!("{}", row.into_iter().collect::<String>());
    }
    println!();
}

fn main() {
    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(7);
    let request = SearchRequest::new(20, 12)
        .with_block_probability(0.25)
        .with_steps_per_second(20)
        .with_seed(seed);
    // Same seed, same layout as the one the search thread builds
    let grid = request.build_grid().unwrap();
    let blocked = (0..request.height as i32)
        .map(|y| {
            (0..request.width as i32)
                .map(|x| grid.is_blocked(&Point::new(x, y)) == Some(true))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    let mut scheduler = Scheduler::new();
    let handle = scheduler.start_search(request.clone()).unwrap();
    for event in handle {
        match event {
            SearchEvent::Observation(o) => draw(&request, &blocked, &o),
            SearchEvent::Finished(SearchResult::Solved { path, cost }) => {
                println!("Found a path of {} steps, cost {:.1}", path.len() - 1, cost)
            }
            SearchEvent::Finished(SearchResult::Unsolvable(reason)) => {
                println!("Unsolvable: {:?}", reason)
            }
        }
    }
}
