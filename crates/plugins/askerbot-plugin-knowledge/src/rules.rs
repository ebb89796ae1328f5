/*!
# Rule set

Every tunable piece of domain knowledge used by query understanding and
scoring lives here as data: intent rules, synonym clusters, thematic boosts,
irrelevance penalties and topic fallbacks. The scorer reads a [`RuleSet`]
and nothing else.
*/

use regex::Regex;

/// Ordered intent classifier entry; the first matching rule wins
#[derive(Debug, Clone)]
pub struct IntentRule {
    /// Intent name, part of the fixed topic vocabulary
    pub intent: &'static str,
    /// Regexes run against the normalized query
    pub patterns: Vec<Regex>,
    /// Plain keywords; a match at the start of a word is confident
    pub keywords: Vec<&'static str>,
    /// Search variants added to the analysis
    pub synonyms: Vec<&'static str>,
    /// Terms whose presence in a chunk signals this intent
    pub boost_terms: Vec<&'static str>,
}

/// A concept and the words that express it
#[derive(Debug, Clone)]
pub struct SynonymCluster {
    /// Concept name, for logs
    pub concept: &'static str,
    /// Words matched at word starts on both query and candidate
    pub words: Vec<&'static str>,
}

/// When a scoring rule fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Normalized query contains any of these fragments
    QueryContains(Vec<&'static str>),
    /// Detected intent equals this name
    Intent(&'static str),
}

/// Adds `weight` to the candidate `target` when `when` holds
///
/// Positive weights are thematic boosts, negative weights are irrelevance
/// penalties.
#[derive(Debug, Clone)]
pub struct ScoringRule {
    /// Trigger
    pub when: Condition,
    /// Candidate id the rule applies to
    pub target: &'static str,
    /// Points added (or removed)
    pub weight: f64,
}

/// Canned reply used when nothing clears the relevance bar
#[derive(Debug, Clone)]
pub struct TopicFallback {
    /// Matched as a substring of the detected intent
    pub intent: &'static str,
    /// Reply text
    pub reply: &'static str,
}

/// The complete declarative rule set
#[derive(Debug, Clone)]
pub struct RuleSet {
    /// Ordered intent rules
    pub intents: Vec<IntentRule>,
    /// Synonym clusters
    pub clusters: Vec<SynonymCluster>,
    /// Bonus for a candidate sharing a cluster the query touches
    pub cluster_bonus: f64,
    /// Boosts and penalties
    pub scoring: Vec<ScoringRule>,
    /// Topic-specific fallbacks, checked in order
    pub topic_fallbacks: Vec<TopicFallback>,
}

fn patterns(sources: &[&str]) -> Vec<Regex> {
    sources
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::error!("invalid intent pattern {:?}: {}", p, e);
                None
            }
        })
        .collect()
}

fn intent(
    intent: &'static str,
    pattern_sources: &[&str],
    keywords: &[&'static str],
    synonyms: &[&'static str],
    boost_terms: &[&'static str],
) -> IntentRule {
    IntentRule {
        intent,
        patterns: patterns(pattern_sources),
        keywords: keywords.to_vec(),
        synonyms: synonyms.to_vec(),
        boost_terms: boost_terms.to_vec(),
    }
}

fn cluster(concept: &'static str, words: &[&'static str]) -> SynonymCluster {
    SynonymCluster {
        concept,
        words: words.to_vec(),
    }
}

fn boost(fragments: &[&'static str], target: &'static str, weight: f64) -> ScoringRule {
    ScoringRule {
        when: Condition::QueryContains(fragments.to_vec()),
        target,
        weight,
    }
}

fn affinity(intent: &'static str, target: &'static str, weight: f64) -> ScoringRule {
    ScoringRule {
        when: Condition::Intent(intent),
        target,
        weight,
    }
}

const TICKET_FRAGMENTS: &[&str] = &["billett", "sesongkort", "vip-"];
const PARKING_FRAGMENTS: &[&str] = &["parker", "p-plass", "bilplass"];
const CAMP_FRAGMENTS: &[&str] = &["treningsleir", "fotballskole", "camp"];
const WHISTLEBLOWING_FRAGMENTS: &[&str] = &["varsl", "avvik", "bekymring"];

impl RuleSet {
    /// The club's built-in rules
    pub fn standard() -> Self {
        let intents = vec![
            intent(
                "varsling",
                &[r"varsl", r"avvik", r"bekymring", r"mobbing", r"trakasser"],
                &["varsle", "avvik", "bekymring"],
                &["varsling", "varslingsknappen", "avvik", "bekymringer"],
                &["varsling", "varslingsknappen", "avvik"],
            ),
            intent(
                "parkering",
                &[r"parker", r"p-plass", r"bilplass"],
                &["parkering", "parkere", "bil"],
                &["parkering", "parkere", "avgift"],
                &["parkering", "avgift", "kampdag"],
            ),
            intent(
                "billetter",
                &[r"billett", r"sesongkort", r"inngang", r"\bvip"],
                &["billett", "sesongkort", "inngang"],
                &["billetter", "enkeltbillett", "sesongkort"],
                &["billett", "enkeltbillett", "sesongkort"],
            ),
            intent(
                "treningsleir",
                &[r"treningsleir", r"fotballskole", r"\bcamp", r"\bleir"],
                &["treningsleir", "fotballskole", "camp"],
                &["treningsleir", "fotballskole"],
                &["treningsleir", "fotballskole", "påmelding"],
            ),
            intent(
                "akademi",
                &[r"akademi", r"\bobos"],
                &["akademi", "obos"],
                &["akademi", "obos akademi"],
                &["akademi", "obos"],
            ),
            intent(
                "priser",
                &[r"\bpris", r"\bkost", r"betal", r"hvor mye", r"kontingent", r"medlemskap"],
                &["pris", "koster", "betale", "medlemskap", "kontingent"],
                &["pris", "priser", "koster", "medlemskap", "kontingent"],
                &["pris", "kostnad", "kontingent"],
            ),
            intent(
                "trenere",
                &[r"trener", r"\bcoach", r"trenerteam", r"\bstab\b"],
                &["trener", "coach", "hovedtrener"],
                &["trener", "trenere", "hovedtrener", "trenerteamet"],
                &["trener", "hovedtrener"],
            ),
            intent(
                "kontakt",
                &[r"kontakt", r"telefon", r"e-?post", r"\bmail", r"\bring(e|er)?\b", r"daglig leder"],
                &["kontakt", "telefon", "epost", "e-post"],
                &["kontakt", "telefon", "e-post"],
                &["kontakt", "telefon", "daglig leder"],
            ),
            intent(
                "styret",
                &[r"\bstyre", r"nestleder"],
                &["styret", "styreleder"],
                &["styret", "styreleder", "nestleder"],
                &["styret", "styreleder"],
            ),
            intent(
                "sponsor",
                &[r"sponsor", r"partner", r"samarbeid"],
                &["sponsor", "partner"],
                &["sponsor", "partnere", "samarbeid"],
                &["sponsor", "partnere"],
            ),
            intent(
                "booking",
                &[r"booking", r"\bbook", r"\bleie", r"møterom"],
                &["booking", "leie", "møterom"],
                &["booking", "leie", "møterom"],
                &["booking", "leies"],
            ),
            intent(
                "apningstider",
                &[r"åpningstid", r"\båpen", r"\båpent", r"\bstenger"],
                &["åpningstider", "åpent"],
                &["åpningstider", "åpent"],
                &["åpningstider", "hverdager"],
            ),
            intent(
                "kamper",
                &[r"terminliste", r"neste kamp", r"\bkamper\b", r"resultat", r"tabell", r"avspark"],
                &["terminliste", "kamp", "resultater", "tabell"],
                &["terminliste", "resultater", "kamper"],
                &["terminliste", "resultater", "tabell"],
            ),
            intent(
                "dugnad",
                &[r"dugnad", r"frivillig", r"hjelpe til"],
                &["dugnad", "frivillig"],
                &["dugnad", "frivillige"],
                &["dugnad", "frivillig"],
            ),
            intent(
                "historie",
                &[r"historie", r"stiftet", r"grunnlagt", r"etablert"],
                &["historie", "stiftet", "grunnlagt"],
                &["historie", "stiftet"],
                &["historie", "stiftet", "1889"],
            ),
            intent(
                "barnefotball",
                &[r"barnefotball", r"spilletid"],
                &["barnefotball", "spilletid"],
                &["barnefotball", "spilletid"],
                &["barnefotball", "retningslinjer"],
            ),
            intent(
                "gatelaget",
                &[r"gatelag", r"asker united", r"inkluder"],
                &["gatelaget"],
                &["gatelaget", "lavterskeltilbud"],
                &["gatelaget"],
            ),
            intent(
                "lag",
                &[r"\bg1\d\b", r"\bj1\d\b", r"\blag(ene|et)?\b", r"spillere", r"\btropp"],
                &["lag", "spillere", "tropp"],
                &["lag", "spillere", "spillertropp"],
                &["spillere", "tropp"],
            ),
            intent(
                "stadion",
                &[r"stadion", r"føyka", r"\bbane", r"adresse", r"finne frem", r"hvor ligger"],
                &["stadion", "føyka", "adresse"],
                &["stadion", "føyka"],
                &["stadion", "føyka", "adresse"],
            ),
        ];

        let clusters = vec![
            cluster("pricing", &["pris", "koster", "kostnad", "betale", "betaling", "kontingent", "avgift"]),
            cluster("contact", &["kontakt", "telefon", "e-post", "epost", "mail", "ring"]),
            cluster("coaching", &["trener", "coach", "hovedtrener", "trenerteam", "stab"]),
            cluster("venue", &["stadion", "føyka", "bane", "arena", "kunstgress", "fotballhuset"]),
            cluster("schedule", &["terminliste", "kamp", "avspark", "resultater", "tabell"]),
            cluster("volunteering", &["dugnad", "frivillig", "bidra", "hjelpe"]),
            cluster("history", &["historie", "stiftet", "grunnlagt", "etablert", "tradisjon"]),
            cluster("academy", &["akademi", "obos", "fotballskole", "treningsleir", "camp"]),
            cluster("parking", &["parkering", "parkere", "bil", "bilplass"]),
            cluster("tickets", &["billett", "enkeltbillett", "sesongkort", "inngang"]),
        ];

        let scoring = vec![
            // Thematic boosts
            boost(WHISTLEBLOWING_FRAGMENTS, "varsling", 40.0),
            boost(TICKET_FRAGMENTS, "billetter", 30.0),
            boost(PARKING_FRAGMENTS, "parkering", 30.0),
            boost(CAMP_FRAGMENTS, "treningsleir", 30.0),
            affinity("parkering", "stadion", 10.0),
            affinity("trenere", "trenere", 30.0),
            affinity("trenere", "lag_struktur", 15.0),
            affinity("priser", "priser_medlemskap", 30.0),
            affinity("priser", "akademi_info", 20.0),
            affinity("akademi", "akademi_info", 25.0),
            affinity("akademi", "akademi_plus", 10.0),
            affinity("kontakt", "kontakt", 25.0),
            affinity("styret", "styret", 30.0),
            affinity("sponsor", "sponsor", 30.0),
            affinity("sponsor", "kontakt", 15.0),
            affinity("booking", "booking", 30.0),
            affinity("apningstider", "apningstider", 30.0),
            affinity("kamper", "kamper", 25.0),
            affinity("dugnad", "dugnad", 25.0),
            affinity("historie", "historie", 25.0),
            affinity("historie", "klubb_info", 10.0),
            affinity("barnefotball", "barnefotball", 25.0),
            affinity("gatelaget", "gatelaget", 25.0),
            affinity("lag", "lag_struktur", 20.0),
            affinity("lag", "spillere_a_lag", 15.0),
            affinity("stadion", "stadion", 25.0),
            // Irrelevance penalties
            boost(TICKET_FRAGMENTS, "priser_medlemskap", -40.0),
            boost(PARKING_FRAGMENTS, "priser_medlemskap", -40.0),
            boost(CAMP_FRAGMENTS, "priser_medlemskap", -30.0),
            boost(WHISTLEBLOWING_FRAGMENTS, "kontakt", -10.0),
        ];

        let topic_fallbacks = vec![
            TopicFallback {
                intent: "billett",
                reply: "Jeg fant ikke akkurat det du spør om billetter.\nBillettinformasjon finner du på askerfotball.no/billetter, eller send en e-post til post@askerfotball.no.",
            },
            TopicFallback {
                intent: "pris",
                reply: "Jeg fant ikke oppdaterte priser for dette.\nKontakt klubben på post@askerfotball.no, så hjelper de deg med priser og medlemskap.",
            },
            TopicFallback {
                intent: "kontakt",
                reply: "Du når Asker Fotball på post@askerfotball.no.\nSportslig leder Morten Sommerfeldt kan nås på +47 907 51 170.",
            },
            TopicFallback {
                intent: "trener",
                reply: "Jeg fant ikke informasjon om dette i trenerstaben.\nSe lagsidene på askerfotball.no eller send en e-post til post@askerfotball.no.",
            },
            TopicFallback {
                intent: "kamp",
                reply: "Terminliste og resultater finner du på askerfotball.no/kamper.",
            },
        ];

        Self {
            intents,
            clusters,
            cluster_bonus: 10.0,
            scoring,
            topic_fallbacks,
        }
    }

    /// Intent names the classifier (and enrichment) may return
    pub fn vocabulary(&self) -> Vec<&'static str> {
        self.intents.iter().map(|r| r.intent).collect()
    }

    /// Whether `name` is a known intent
    pub fn knows_intent(&self, name: &str) -> bool {
        self.intents.iter().any(|r| r.intent == name)
    }

    /// Rule for a known intent
    pub fn intent_rule(&self, name: &str) -> Option<&IntentRule> {
        self.intents.iter().find(|r| r.intent == name)
    }

    /// Topic fallback for an intent, if any
    pub fn topic_fallback(&self, intent: &str) -> Option<&TopicFallback> {
        self.topic_fallbacks
            .iter()
            .find(|f| intent.contains(f.intent))
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::standard()
    }
}

impl Condition {
    /// Evaluate against a normalized query and detected intent
    pub fn holds(&self, normalized_query: &str, intent: Option<&str>) -> bool {
        match self {
            Condition::QueryContains(fragments) => {
                fragments.iter().any(|f| normalized_query.contains(f))
            }
            Condition::Intent(name) => intent == Some(*name),
        }
    }
}
