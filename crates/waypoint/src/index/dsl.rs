//! Rendering of a [`PlaceQuery`] as an Elasticsearch/OpenSearch query body.
//!
//! The body mirrors what [`TantivyPlaceIndex`](super::TantivyPlaceIndex)
//! executes, so a search cluster holding the same documents (multilingual
//! fields as `name.<key>` sub-objects, exact names under `name.<key>.raw`)
//! ranks the same way.

use serde_json::{Value, json};

use super::PlaceQuery;
use crate::search::{FieldBoost, FieldPath, HousenumberGuard, MatchSpec, ScoringPolicy, TextField};

fn weighted(field: &FieldBoost) -> String {
    format!("{}^{}", field.path, field.boost)
}

fn text_match(spec: &MatchSpec) -> Value {
    let fields: Vec<String> = spec.token_fields().map(weighted).collect();
    json!({
        "multi_match": {
            "query": spec.text(),
            "type": "cross_fields",
            "operator": "or",
            "fields": fields,
            "minimum_should_match": spec.strictness().minimum_should_match(),
        }
    })
}

fn exact_matches(spec: &MatchSpec) -> Vec<Value> {
    spec.exact_fields()
        .map(|field| {
            json!({
                "match": {
                    field.path.to_string(): {
                        "query": spec.exact_text(),
                        "analyzer": "search_raw",
                        "boost": field.boost,
                    }
                }
            })
        })
        .collect()
}

fn fuzzy_match(spec: &MatchSpec) -> Option<Value> {
    let fuzziness = spec.fuzziness();
    if fuzziness.max_edits == 0 {
        return None;
    }
    let fields: Vec<String> = spec
        .token_fields()
        .filter(|f| matches!(f.path, FieldPath::Text(TextField::Name, _)))
        .map(weighted)
        .collect();
    Some(json!({
        "multi_match": {
            "query": spec.text(),
            "type": "best_fields",
            "fields": fields,
            "fuzziness": fuzziness.max_edits,
            "prefix_length": fuzziness.prefix_length,
            "minimum_should_match": spec.strictness().minimum_should_match(),
            "boost": 0.5,
        }
    }))
}

fn score_functions(scoring: &ScoringPolicy) -> Vec<Value> {
    let mut functions = vec![json!({
        "script_score": {
            "script": {
                "source": "1 + doc['importance'].value * params.factor",
                "params": { "factor": scoring.importance().factor() },
            }
        }
    })];
    if let Some(decay) = scoring.decay() {
        let center = decay.center();
        functions.push(json!({
            "script_score": {
                "script": {
                    "source": "double d = doc['coordinate'].arcDistance(params.lat, params.lon) / 1000.0; \
                               params.floor + (1 - params.floor) * Math.exp(-5.0 * d / params.horizon)",
                    "params": {
                        "lat": center.lat,
                        "lon": center.lon,
                        "horizon": decay.horizon_km(),
                        "floor": decay.floor(),
                    },
                }
            }
        }));
    }
    functions
}

fn guard_filter(guard: &HousenumberGuard) -> Value {
    let mut should = vec![
        json!({ "bool": { "must_not": { "exists": { "field": "housenumber" } } } }),
        json!({ "match": { "housenumber": { "query": guard.tokens().join(" "), "analyzer": "standard" } } }),
    ];
    should.extend(
        guard
            .name_variants()
            .iter()
            .map(|key| json!({ "exists": { "field": format!("name.{key}") } })),
    );
    json!({ "bool": { "should": should, "minimum_should_match": 1 } })
}

pub(super) fn render(query: &PlaceQuery) -> Value {
    let spec = &query.match_spec;

    // A token matches either exactly in any field or fuzzily in a name.
    let mut token_match = vec![text_match(spec)];
    token_match.extend(fuzzy_match(spec));

    let inner = json!({
        "bool": {
            "must": { "bool": { "should": token_match, "minimum_should_match": 1 } },
            "should": exact_matches(spec),
        }
    });

    json!({
        "query": {
            "bool": {
                "must": {
                    "function_score": {
                        "query": inner,
                        "functions": score_functions(&query.scoring),
                        "score_mode": "multiply",
                        "boost_mode": "multiply",
                    }
                },
                "filter": guard_filter(&query.guard),
            }
        },
        "size": query.limit,
    })
}

#[cfg(test)]
mod tests {
    use waypoint_data::{Coordinate, Locale};

    use crate::{
        config::SearchConfig,
        index::PlaceQuery,
        search::{HousenumberGuard, QueryCompiler, Strictness},
    };

    fn query(strictness: Strictness, center: Option<Coordinate>) -> PlaceQuery {
        PlaceQuery {
            match_spec: QueryCompiler::default().compile("25 rue bergère", Locale::Fr, strictness),
            scoring: SearchConfig::default().scoring_policy(center.as_ref()),
            guard: HousenumberGuard::new("25 rue bergère", Locale::Fr),
            limit: 15,
        }
    }

    #[test]
    fn test_strict_body() {
        let body = query(Strictness::Strict, None).to_dsl();
        let function_score = &body["query"]["bool"]["must"]["function_score"];
        let inner = &function_score["query"]["bool"];
        let text = &inner["must"]["bool"]["should"][0]["multi_match"];

        assert_eq!(text["minimum_should_match"], "100%");
        assert_eq!(text["fields"][0], "name.fr^1");
        assert_eq!(body["size"], 15);

        let fuzzy = &inner["must"]["bool"]["should"][1]["multi_match"];
        assert_eq!(fuzzy["fuzziness"], 1);
        assert_eq!(fuzzy["prefix_length"], 2);
        assert_eq!(fuzzy["fields"].as_array().unwrap().len(), 2);

        let exact = &inner["should"][0]["match"]["name.fr.raw"];
        assert_eq!(exact["query"], "25 rue bergère");
        assert_eq!(exact["boost"], 7.0);

        let functions = function_score["functions"].as_array().unwrap();
        assert_eq!(functions.len(), 1, "no decay without a center");
        assert_eq!(functions[0]["script_score"]["script"]["params"]["factor"], 100.0);
    }

    #[test]
    fn test_relaxed_body() {
        let body = query(Strictness::Relaxed, None).to_dsl();
        let token_match =
            &body["query"]["bool"]["must"]["function_score"]["query"]["bool"]["must"]["bool"];
        assert_eq!(token_match["should"][0]["multi_match"]["minimum_should_match"], "1");
        assert_eq!(token_match["minimum_should_match"], 1);
    }

    #[test]
    fn test_decay_function_present_with_center() {
        let body = query(Strictness::Strict, Coordinate::new(48.87, 2.34)).to_dsl();
        let functions = body["query"]["bool"]["must"]["function_score"]["functions"]
            .as_array()
            .unwrap()
            .clone();
        assert_eq!(functions.len(), 2);
        let params = &functions[1]["script_score"]["script"]["params"];
        assert_eq!(params["lat"], 48.87);
        assert_eq!(params["horizon"], 100.0);
        assert_eq!(params["floor"], 0.2);
    }

    #[test]
    fn test_guard_filter() {
        let body = query(Strictness::Strict, None).to_dsl();
        let should = body["query"]["bool"]["filter"]["bool"]["should"]
            .as_array()
            .unwrap()
            .clone();
        assert_eq!(should.len(), 4);
        assert_eq!(should[1]["match"]["housenumber"]["query"], "25 rue bergère");
        assert_eq!(should[2]["exists"]["field"], "name.fr");
        assert_eq!(should[3]["exists"]["field"], "name.default");
    }
}
