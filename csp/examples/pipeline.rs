//! A small pipeline: a generator, a squaring stage fanned out to two
//! printers, and a timer that stops the generator.
//!
//! Run with `RUST_LOG=fibre_csp=debug cargo run --example pipeline`.

use fibre_csp::{after, chan, Channel, Multicast, Select};
use tracing_subscriber::EnvFilter;

async fn generate(out: Channel<u64>, stop: Channel<std::time::Duration>) {
  let mut n = 0;
  loop {
    let stopped = Select::new()
      .recv(&stop, |_| async { true })
      .default_case(|| async { false })
      .await;
    if stopped || out.put(n).await.is_err() {
      break;
    }
    n += 1;
  }
  let _ = out.close();
}

async fn square(input: Channel<u64>, out: Channel<u64>) {
  let mut values = input.stream();
  while let Some(v) = futures_util::StreamExt::next(&mut values).await {
    if out.put(v * v).await.is_err() {
      break;
    }
  }
  let _ = out.close();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let numbers = chan::<u64>();
  let squares = chan::<u64>();
  let stop = after(50)?;

  // Subscribe before anything is produced; late copies see no replay.
  let fan_out = Multicast::new(squares.clone());
  let printers: Vec<_> = ["left", "right"]
    .into_iter()
    .map(|name| {
      let sub = fan_out.copy();
      tokio::spawn(async move {
        let mut count = 0usize;
        while let Some(v) = sub.pop().await {
          count += 1;
          if count <= 3 {
            println!("{name}: {v}");
          }
        }
        count
      })
    })
    .collect();

  tokio::spawn(generate(numbers.clone(), stop));
  tokio::spawn(square(numbers, squares));

  for printer in printers {
    println!("printer saw {} values", printer.await?);
  }
  Ok(())
}
