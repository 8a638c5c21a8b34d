use workpool::{Result, ThreadPool};

fn main() -> Result<()> {
    env_logger::init();

    let pool = ThreadPool::default();
    println!("pool running with {} workers", pool.threads());

    // Fan a batch of independent computations across the workers.
    let squares: Vec<_> = (1i64..=8)
        .map(|i| pool.submit(move || i * i))
        .collect::<Result<_>>()?;
    for (i, task) in squares.iter().enumerate() {
        println!("{}^2 = {}", i + 1, task.result()?);
    }

    // Chain continuations onto a single computation.
    let chained = pool
        .submit(|| 2)?
        .continue_with(|x| x * 2)?
        .continue_with(|x| x * 2)?;
    println!("2 doubled twice = {}", chained.result()?);

    pool.shutdown();
    Ok(())
}
