//! The two fixed example networks.

use super::cpd::TabularCpd;
use super::factor::Variable;
use super::network::BayesianNetwork;
use crate::models::Result;

/// Nodes of the burglary-alarm network, in display order.
pub const ALARM_NODES: [&str; 5] = ["Burglary", "Earthquake", "Alarm", "JohnCalls", "MaryCalls"];

/// Edges of the burglary-alarm network.
pub const ALARM_EDGES: [(&str, &str); 4] = [
    ("Burglary", "Alarm"),
    ("Earthquake", "Alarm"),
    ("Alarm", "JohnCalls"),
    ("Alarm", "MaryCalls"),
];

/// Nodes of the musicianship network, in display order.
pub const MUSICIANSHIP_NODES: [&str; 5] = ["Difficulty", "Musicianship", "Rating", "Exam", "Letter"];

/// Edges of the musicianship network.
pub const MUSICIANSHIP_EDGES: [(&str, &str); 4] = [
    ("Difficulty", "Rating"),
    ("Musicianship", "Rating"),
    ("Musicianship", "Exam"),
    ("Rating", "Letter"),
];

/// Graph with nodes declared up front so column order is stable.
pub fn structure(nodes: &[&str], edges: &[(&str, &str)]) -> Result<BayesianNetwork> {
    let mut network = BayesianNetwork::default();
    for node in nodes {
        network.add_node(node);
    }
    for (parent, child) in edges {
        network.add_edge(parent, child)?;
    }
    Ok(network)
}

fn boolean(name: &str) -> Variable {
    Variable::new(name, &["True", "False"])
}

/// Burglary, Earthquake → Alarm → JohnCalls, MaryCalls.
///
/// State 0 is True, state 1 is False for every variable.
pub fn alarm() -> Result<BayesianNetwork> {
    let mut network = structure(&ALARM_NODES, &ALARM_EDGES)?;

    let burglary = TabularCpd::root(boolean("Burglary"), &[0.001, 0.999])?;
    let earthquake = TabularCpd::root(boolean("Earthquake"), &[0.002, 0.998])?;
    let alarm = TabularCpd::new(
        boolean("Alarm"),
        vec![
            vec![0.95, 0.94, 0.29, 0.001],
            vec![0.05, 0.06, 0.71, 0.999],
        ],
        vec![boolean("Burglary"), boolean("Earthquake")],
    )?;
    let john_calls = TabularCpd::new(
        boolean("JohnCalls"),
        vec![vec![0.95, 0.05], vec![0.05, 0.95]],
        vec![boolean("Alarm")],
    )?;
    let mary_calls = TabularCpd::new(
        boolean("MaryCalls"),
        vec![vec![0.7, 0.1], vec![0.3, 0.9]],
        vec![boolean("Alarm")],
    )?;

    network.add_cpds([burglary, earthquake, alarm, john_calls, mary_calls])?;
    network.check_model()?;
    Ok(network)
}

/// Difficulty, Musicianship → Rating → Letter; Musicianship → Exam.
pub fn musicianship() -> Result<BayesianNetwork> {
    let mut network = structure(&MUSICIANSHIP_NODES, &MUSICIANSHIP_EDGES)?;

    let difficulty = Variable::new("Difficulty", &["Low", "High"]);
    let musicianship = Variable::new("Musicianship", &["Weak", "Strong"]);
    let rating = Variable::new("Rating", &["*", "**", "***"]);
    let exam = Variable::new("Exam", &["Low", "High"]);
    let letter = Variable::new("Letter", &["Weak", "Strong"]);

    let cpds = [
        TabularCpd::root(difficulty.clone(), &[0.6, 0.4])?,
        TabularCpd::root(musicianship.clone(), &[0.7, 0.3])?,
        TabularCpd::new(
            rating.clone(),
            vec![
                vec![0.3, 0.05, 0.9, 0.5],
                vec![0.4, 0.25, 0.08, 0.3],
                vec![0.3, 0.7, 0.02, 0.2],
            ],
            vec![difficulty, musicianship.clone()],
        )?,
        TabularCpd::new(
            exam,
            vec![vec![0.95, 0.2], vec![0.05, 0.8]],
            vec![musicianship],
        )?,
        TabularCpd::new(
            letter,
            vec![vec![0.1, 0.4, 0.99], vec![0.9, 0.6, 0.01]],
            vec![rating],
        )?,
    ];

    network.add_cpds(cpds)?;
    network.check_model()?;
    Ok(network)
}
