use markov_dp::{value_iteration, Error, MarkovDecisionProcess};

fn main() -> Result<(), Error> {
    // "right" from A reaches B, which pays 1 per step whichever action is taken.
    let mdp = MarkovDecisionProcess::new(
        vec!["A", "B"],
        vec!["left", "right"],
        vec![1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
        vec![0.0, 0.0, 1.0, 1.0],
        0.9,
    )?;
    mdp.validate_stochastic(1e-9)?;

    let (policy, values) = value_iteration(&mdp, 100);

    println!("Policy:");
    for (state, action) in policy.iter() {
        println!("  {} -> {}", state, action);
    }
    println!("Values:");
    for (state, value) in values.iter() {
        println!("  {} = {:.6}", state, value);
    }

    Ok(())
}
