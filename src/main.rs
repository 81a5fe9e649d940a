use clap::Parser;
use globalswe::config::{Cli, RunConfig};
use globalswe::diagnostics;
use globalswe::grid::Grid;
use globalswe::io::{dump_snapshot, RunTag};
use globalswe::models::AnyInitialCondition;
use globalswe::refsol::{export_reference, EquiangularCubedSphere};
use globalswe::scheme::{Scheme, StepOutcome};
use globalswe::state::State;
use globalswe::traits::InitialCondition;
use std::path::Path;
use std::process::ExitCode;

fn run() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = RunConfig::for_case(cli.ic, cli.dump_ref > 0)?;
    config.validate()?;

    let ic = AnyInitialCondition::for_case(config.ic)?;
    ic.validate()?;

    let grid = Grid::new(config.nx, config.ny, globalswe::config::R_EARTH);
    let mut state = State::from_initial_condition(&grid, &ic);

    let coriolis = config.coriolis_scheme()?;
    let advection = config.advection_scheme()?;
    let mut scheme = Scheme::new(
        &grid,
        coriolis,
        advection,
        ic.two_omega(),
        ic.phi_ref(),
        config.dt,
        config.alpha(),
        config.outer_iters,
        config.inner_iters,
        config.relax_mode.to_relax_mode(),
    )?;

    log::info!(
        "starting ic={} grid={}x{} dt={:.1}s t_stop={:.0}s",
        config.ic, config.nx, config.ny, config.dt, config.t_stop
    );

    let n_steps = (config.t_stop / config.dt).round() as u64;
    let mut unstable = false;
    for step in 0..n_steps {
        match scheme.step(&grid, &mut state) {
            StepOutcome::Advanced => {}
            StepOutcome::Unstable { max_delta_u } => {
                log::warn!("instability detected at step {step}: max |delta u| = {max_delta_u:.3}");
                unstable = true;
                break;
            }
        }
        if diagnostics::has_non_finite(&state) {
            log::warn!("non-finite field detected at step {step}");
            unstable = true;
            break;
        }
    }

    let mass_now = diagnostics::mass(&grid, &state.phi);
    log::info!("finished at t={:.0}s, mass={mass_now:.6e}", state.time);

    let out_dir = Path::new("out");
    let tag = RunTag {
        ic: config.ic,
        coriolis: config.coriolis.as_str(),
        scheme: config.scheme.as_str(),
        nx: config.nx,
        ny: config.ny,
    };

    let vorticity = diagnostics::relative_vorticity(&grid, &state.u, &state.v);
    let pv = diagnostics::potential_vorticity(&grid, &state.u, &state.v, &state.phi, ic.two_omega(), globalswe::config::G);
    let h = {
        let mut h = state.phi.clone();
        for j in 0..h.ny() {
            for i in 0..h.nx() {
                h.set(i, j, h.get(i, j) / globalswe::config::G);
            }
        }
        h
    };
    dump_snapshot(out_dir, &tag, &state.u, &state.v, &h, &vorticity, &pv, None)?;

    if config.dump_ref {
        let target = EquiangularCubedSphere::new(config.ny / 4);
        export_reference(out_dir, &tag, &grid, &state.phi, &state.u, &state.v, &target)?;
    }

    if unstable && config.ic == 8 {
        anyhow::bail!("ic=8 run went unstable, as expected by the Hollingsworth analysis");
    }
    if unstable {
        anyhow::bail!("run went unstable before reaching t_stop");
    }
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
