use asgrid::algorithms::coarsening::CoarseningOptions;
use asgrid::algorithms::refinement::RefinementOptions;
use asgrid::errors::GridError;
use asgrid::grids::linear_grid::LinearGrid;
use asgrid::refinement::surplus::SurplusRefinement;
use asgrid::storage::BoundingBox;

fn one_d() -> Result<(), GridError>
{
    println!("\nRunning \"one_d\" example\n");
    // Build the 1D grid object, one value per node.
    let mut grid = LinearGrid::new(1, 1);
    // a sparse grid in 1D is identical to a full grid
    grid.sparse_grid(&[5])?;

    let f = |x: &[f64]| vec![x[0].powi(2)];
    grid.update_values(&f);
    grid.hierarchize()?;

    let x = [0.3];
    let mut result = [0.0];
    grid.interpolate(&x, &mut result)?;
    let error = (result[0] - f(&x)[0]).abs();
    println!("x={:?}, calculated {}, expected {}. Error={error}", x, result[0], f(&x)[0]);
    println!("Number of points: {}", grid.len());
    // aim for a tenth of the current error
    grid.refine(&SurplusRefinement::new(1, 1), &f, &RefinementOptions::new(error / 10.0), 10)?;
    println!("Number of points after refinement: {}", grid.len());
    grid.interpolate(&x, &mut result)?;
    println!("x={:?}, calculated {}, expected {}. Error={}", x, result[0], f(&x)[0], (result[0] - f(&x)[0]).abs());
    Ok(())
}

///
/// A 2D grid with boundaries; refinement tightens the interpolation, then
/// coarsening drops the points that no longer contribute.
///
fn two_d() -> Result<(), GridError>
{
    println!("\nRunning \"two_d\" example\n");
    let mut grid = LinearGrid::new(2, 1);
    grid.full_grid_with_boundaries(5)?;

    let f = |x: &[f64]| vec![x[0].powi(2) + x[1].powi(2)];
    grid.update_values(&f);
    grid.hierarchize()?;

    let x = [0.3, 0.1];
    let mut result = [0.0];
    grid.interpolate(&x, &mut result)?;
    let error = (result[0] - f(&x)[0]).abs();
    println!("x={:?}, calculated {}, expected {}. Error={error}", x, result[0], f(&x)[0]);
    println!("Number of points: {}", grid.len());
    grid.refine(&SurplusRefinement::new(2, 1), &f, &RefinementOptions::new(error / 10.0), 10)?;
    println!("Number of points after refinement: {}", grid.len());
    grid.coarsen(&SurplusRefinement::new(2, 1), &CoarseningOptions::new(1e-8))?;
    println!("Number of points after coarsening: {}", grid.len());
    grid.interpolate(&x, &mut result)?;
    println!("x={:?}, calculated {}, expected {}. Error={}", x, result[0], f(&x)[0], (result[0] - f(&x)[0]).abs());
    Ok(())
}

///
/// A 6D sparse grid; full grids are hopeless here.
///
fn six_d() -> Result<(), GridError>
{
    println!("\nRunning \"six_d\" example\n");
    let mut grid = LinearGrid::new(6, 1);
    grid.sparse_grid(&[4; 6])?;

    let f = |x: &[f64]| vec![x.iter().map(|v| v * v * v).sum()];
    grid.update_values(&f);
    grid.hierarchize()?;

    let x = [0.3, 0.1, 0.2, 0.1, 0.4, 0.7];
    let mut result = [0.0];
    grid.interpolate(&x, &mut result)?;
    let error = (result[0] - f(&x)[0]).abs();
    println!("x={:?}, calculated {}, expected {}. Error={error}", x, result[0], f(&x)[0]);
    println!("Number of points: {}", grid.len());
    grid.refine(&SurplusRefinement::new(6, 1), &f, &RefinementOptions::new(error / 100.0), 10)?;
    println!("Number of points after refinement: {}", grid.len());
    grid.interpolate(&x, &mut result)?;
    println!("x={:?}, calculated {}, expected {}. Error={}", x, result[0], f(&x)[0], (result[0] - f(&x)[0]).abs());
    Ok(())
}

fn one_d_grid_with_bounding_box() -> Result<(), GridError>
{
    println!("\nRunning \"one_d_grid_with_bounding_box\"\n");
    let mut grid = LinearGrid::new(1, 1);
    grid.sparse_grid(&[5])?;
    *grid.base_mut().bounding_box_mut() = BoundingBox::new(&[0.0], &[5.0]);

    let f = |x: &[f64]| vec![x[0].powi(2)];
    grid.update_values(&f);
    grid.hierarchize()?;

    let x = [3.0];
    let mut result = [0.0];
    grid.interpolate(&x, &mut result)?;
    let error = (result[0] - f(&x)[0]).abs();
    println!("x={:?}, calculated {}, expected {}. Error={error}", x, result[0], f(&x)[0]);
    println!("Number of points: {}", grid.len());
    grid.refine(&SurplusRefinement::new(1, 1), &f, &RefinementOptions::new(error / 1000.0), 10)?;
    println!("Number of points after refinement: {}", grid.len());
    grid.interpolate(&x, &mut result)?;
    println!("x={:?}, calculated {}, expected {}. Error={}", x, result[0], f(&x)[0], (result[0] - f(&x)[0]).abs());
    Ok(())
}

fn main()
{
    one_d().unwrap();
    two_d().unwrap();
    six_d().unwrap();
    one_d_grid_with_bounding_box().unwrap();
}
