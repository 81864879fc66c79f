use asgrid::errors::GridError;
use asgrid::grids::linear_grid::LinearGrid;
use criterion::{criterion_group, criterion_main, Criterion};

fn build_six_d_grid() -> Result<LinearGrid, GridError>
{
    let mut grid = LinearGrid::new(6, 1);
    grid.full_grid_with_boundaries(3)?;

    let f = |x: &[f64]| vec![x.iter().map(|v| v * v * v).sum()];
    grid.update_values(&f);
    grid.hierarchize()?;
    Ok(grid)
}

fn six_d(grid: &LinearGrid) -> Result<(), GridError>
{
    let x: Vec<f64> = [0.3, 0.1, 0.2, 0.1, 0.4, 0.7].repeat(1000);
    let _value = grid.interpolate_batch(&x)?;
    Ok(())
}

fn run_six_d(c: &mut Criterion)
{
    let grid = build_six_d_grid().unwrap();
    c.bench_function("6d", |b| b.iter(|| six_d(&grid).unwrap()));
}

criterion_group!(benches, run_six_d);
criterion_main!(benches);
