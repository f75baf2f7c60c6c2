/// Cypher query templates for the activity graph store
pub mod templates {
    pub const ACCOUNT_PLAYERS: &str = r#"
        MATCH (p:Player {account: $account})
        RETURN p.playerId AS id, p.name AS name, p.combatLevel AS combatLevel
    "#;

    pub const PLAYER_SUMMARY: &str = r#"
        MATCH (p:Player {account: $account, playerId: $playerId})
        RETURN p.playerId AS id, p.name AS name, p.combatLevel AS combatLevel
    "#;

    pub const PLAYER_GRAPH: &str = r#"
        MATCH (p:Player {account: $account, playerId: $playerId})
        WITH p
        MATCH (e)-[:PERFORMED_BY]->(p)
        WITH p, e
        LIMIT 10000
        OPTIONAL MATCH (e)-[r]->(n)
        WHERE type(r) <> "PART_OF" AND type(r) <> "PERFORMED_BY"
        WITH p, e, r, n
        RETURN
            collect(distinct p) AS players,
            collect(distinct e) AS events,
            collect(distinct n) AS entities,
            collect(distinct r) AS relationships
    "#;

    pub const ACCOUNT_GRAPH: &str = r#"
        MATCH (p:Player {account: $account})
        WITH p
        MATCH (e)-[:PERFORMED_BY]->(p)
        WITH p, e
        LIMIT 10000
        OPTIONAL MATCH (e)-[r]->(n)
        WHERE type(r) <> "PART_OF" AND type(r) <> "PERFORMED_BY"
        WITH p, e, r, n
        RETURN
            collect(distinct p) AS players,
            collect(distinct e) AS events,
            collect(distinct n) AS entities,
            collect(distinct r) AS relationships
    "#;

    /// Which events each of the account's players performed. The graph queries
    /// drop PERFORMED_BY edges, so ownership comes from here.
    pub const PLAYER_EVENT_OWNERSHIP: &str = r#"
        MATCH (p:Player {account: $account})
        MATCH (e)-[:PERFORMED_BY]->(p)
        RETURN p.playerId AS playerId, e.uuid AS eventId
    "#;
}

/// Query builder helpers
pub mod builders {
    use serde_json::{json, Value};

    pub fn account_params(account: &str) -> Value {
        json!({ "account": account })
    }

    pub fn player_params(account: &str, player_id: &str) -> Value {
        json!({ "account": account, "playerId": player_id })
    }
}
