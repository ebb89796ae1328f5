/*!
# Lexicon

Hand-curated knowledge about the club: one entry per topic, keyed by a
unique topic key. Loaded once at start and never mutated.
*/

use crate::scorer::Candidate;
use askerbot_core::{AskerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// One curated knowledge topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    /// Unique topic key
    pub key: String,
    /// Page title shown as citation
    pub title: String,
    /// Knowledge text handed to the answer prompt
    pub body: String,
    /// Canonical page URL
    pub url: String,
}

impl KnowledgeEntry {
    /// Build an entry
    pub fn new(
        key: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            body: body.into(),
            url: url.into(),
        }
    }
}

/// The loaded lexicon with precomputed scoring candidates
#[derive(Debug, Clone)]
pub struct Lexicon {
    entries: Vec<KnowledgeEntry>,
    candidates: Vec<Arc<Candidate>>,
}

impl Lexicon {
    /// Build a lexicon; keys must be unique
    pub fn new(entries: Vec<KnowledgeEntry>) -> Result<Self> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.key.as_str()) {
                return Err(AskerError::validation(format!(
                    "duplicate lexicon key '{}'",
                    entry.key
                )));
            }
        }

        let candidates = entries
            .iter()
            .map(|e| Arc::new(Candidate::new(&e.key, &e.title, &e.url, &e.body)))
            .collect();

        Ok(Self {
            entries,
            candidates,
        })
    }

    /// The club's built-in lexicon
    pub fn standard() -> Self {
        let entries = STANDARD_ENTRIES
            .iter()
            .map(|(key, title, url, body)| KnowledgeEntry::new(*key, *title, *url, *body))
            .collect::<Vec<_>>();
        let candidates = entries
            .iter()
            .map(|e| Arc::new(Candidate::new(&e.key, &e.title, &e.url, &e.body)))
            .collect();
        Self {
            entries,
            candidates,
        }
    }

    /// Look up an entry by key
    pub fn get(&self, key: &str) -> Option<&KnowledgeEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// All entries in table order
    pub fn entries(&self) -> &[KnowledgeEntry] {
        &self.entries
    }

    /// Scoring candidates, one per entry
    pub fn candidates(&self) -> &[Arc<Candidate>] {
        &self.candidates
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the lexicon is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// (key, title, url, body)
const STANDARD_ENTRIES: &[(&str, &str, &str, &str)] = &[
    (
        "klubb_info",
        "Om Asker Fotball",
        "https://askerfotball.no/om-klubben",
        "Asker Fotball er en av Norges eldste fotballklubber og holder til på Føyka stadion i Asker sentrum. \
         Klubben har lag for barn, ungdom, damer, herrer og veteraner, og skal gi et godt fotballtilbud til alle som ønsker å spille.",
    ),
    (
        "akademi_info",
        "OBOS Akademi",
        "https://askerfotball.no/akademi",
        "OBOS Akademi er Asker Fotballs treningstilbud for spillere fra 7 til 13 år. \
         Akademiet gir ekstra trening med kvalifiserte trenere og fokus på teknikk og spilleforståelse. \
         Prisen er fra 955,- til 2500,- per måned avhengig av antall dager i uken.",
    ),
    (
        "akademi_plus",
        "Akademi+",
        "https://askerfotball.no/akademi-pluss",
        "Akademi+ er et forsterket tilbud for ekstra motiverte spillere mellom 10 og 16 år, med flere økter i uken og individuell oppfølging. \
         Spørsmål om Akademi+ kan rettes til Lars Henrik på lars.henrik@askerfotball.no.",
    ),
    (
        "trenere",
        "Trenere A-laget",
        "https://askerfotball.no/lag/a-laget/stab",
        "Hovedtrener for A-laget er Magnus Bredal. \
         Trenerteamet består ellers av Bård Heggset, Ismet Duracak, Jakob Lillestjerna og Alain Antonio Astudillo.",
    ),
    (
        "stadion",
        "Føyka stadion",
        "https://askerfotball.no/foyka",
        "Føyka stadion ligger i Asker sentrum, kort gangavstand fra Asker stasjon. \
         Stadion har 1450 sitteplasser og en total kapasitet på omtrent 2400 tilskuere. \
         Kunstgresset brukes til både kamper og trening.",
    ),
    (
        "parkering",
        "Parkering ved Føyka",
        "https://askerfotball.no/foyka/parkering",
        "Det er begrenset parkering ved Føyka stadion. \
         På kampdager er det avgift på de kommunale parkeringsplassene rundt stadion, og du betaler via skiltet automat eller app. \
         Vi anbefaler å parkere ved Asker stasjon eller ta tog og buss, siden Føyka ligger kort gangavstand fra stasjonen.",
    ),
    (
        "billetter",
        "Billetter og enkeltbillett",
        "https://askerfotball.no/billetter",
        "Billetter til A-lagets hjemmekamper på Føyka kjøpes digitalt før kampstart. \
         En enkeltbillett koster 150,- for voksne og 50,- for barn og ungdom. \
         Sesongkort gir adgang til alle seriekamper, og VIP-billetter med servering kan bestilles ved å kontakte klubben.",
    ),
    (
        "priser_medlemskap",
        "Priser og medlemskap",
        "https://askerfotball.no/medlemskap",
        "Medlemskap i Asker Fotball koster en årlig medlemskontingent, og aktive spillere betaler i tillegg treningsavgift. \
         OBOS Akademi koster 955,- til 2500,- per måned avhengig av antall dager. \
         For oppdaterte priser, kontakt klubben på post@askerfotball.no.",
    ),
    (
        "varsling",
        "Varsling av avvik og bekymringer",
        "https://askerfotball.no/varsling",
        "Hvis du opplever eller ser noe som ikke er i orden i klubben, kan du melde avvik og bekymringer gjennom varslingsknappen på nettsiden. \
         Varsler behandles konfidensielt av klubbens varslingsansvarlige.",
    ),
    (
        "kontakt",
        "Kontakt oss",
        "https://askerfotball.no/kontakt",
        "Du når Asker Fotball på post@askerfotball.no. \
         Daglig leder er Rolf-Magne Walstad (walstad@askerfotball.no). \
         Sportslig leder er Morten Sommerfeldt, morten@askerfotball.no, telefon +47 907 51 170.",
    ),
    (
        "lag_struktur",
        "Lag og struktur",
        "https://askerfotball.no/lag",
        "Asker Fotball har A-lag for herrer, damelag, juniorlag og aldersbestemte lag fra G13 til G19 og J13 til J19. \
         Barnefotballen organiseres per årskull fra 6 til 12 år.",
    ),
    (
        "spillere_a_lag",
        "Spillere A-laget",
        "https://askerfotball.no/lag/a-laget",
        "A-laget har en spillertropp med både erfarne og unge spillere. \
         Keepere er Oskar Slotta Karlsen og Sigurd Olav Normann, forsvarsspillere blant andre Jonas Skulstad og Joachim Prent-Eckbo, \
         midtbanespillere Mohammed Jatta og Jimmy Kenyi, og angrepsspillere Jens-Erik Johansen og Lansana Sesay.",
    ),
    (
        "historie",
        "Klubbens historie",
        "https://askerfotball.no/historie",
        "Asker Fotball ble stiftet i 1889 og er en av landets eldste klubber. \
         Klubben har lang tradisjon for ungdomsutvikling og har fostret mange spillere som har gått videre til toppfotballen.",
    ),
    (
        "treningsleir",
        "Fotballskole og treningsleir",
        "https://askerfotball.no/fotballskole",
        "Asker Fotball arrangerer fotballskole i sommerferien og treningsleir i høstferien for barn fra 6 til 13 år. \
         Treningsleiren koster 1600,- for fire dager inkludert lunsj og drakt. Påmelding skjer via klubbens nettside.",
    ),
    (
        "dugnad",
        "Dugnad og frivillighet",
        "https://askerfotball.no/dugnad",
        "Klubben er avhengig av frivillige. Foreldre bidrar på dugnad ved kamper, kiosksalg og arrangementer. \
         Dugnadsplaner fordeles av lagleder for hvert lag.",
    ),
    (
        "booking",
        "Leie av bane og Fotballhuset",
        "https://askerfotball.no/booking",
        "Baner på Føyka og møterom i Fotballhuset kan leies av lag, bedrifter og privatpersoner. \
         Send forespørsel om booking til post@askerfotball.no med ønsket dato og tidspunkt.",
    ),
    (
        "styret",
        "Styret i Asker Fotball",
        "https://askerfotball.no/styret",
        "Styreleder i Asker Fotball er Ulrik Arneberg, og nestleder er Espen Falck. \
         Styret velges på årsmøtet og har ansvar for klubbens økonomi og langsiktige utvikling.",
    ),
    (
        "sponsor",
        "Sponsor og partnere",
        "https://askerfotball.no/partnere",
        "Asker Fotball samarbeider med en rekke lokale og nasjonale partnere, blant annet OBOS. \
         Bedrifter som ønsker å bli sponsor kan kontakte klubben for å høre om samarbeidsmuligheter og synlighet på Føyka.",
    ),
    (
        "apningstider",
        "Åpningstider Fotballhuset",
        "https://askerfotball.no/fotballhuset",
        "Fotballhuset ved Føyka har åpent for besøkende på hverdager fra 09.00 til 16.00. \
         Klubbkontoret kan også nås på e-post utenfor åpningstidene.",
    ),
    (
        "kamper",
        "Terminliste og resultater",
        "https://askerfotball.no/kamper",
        "Terminliste og resultater for A-laget finner du på klubbens kampside. \
         Hjemmekampene spilles på Føyka, normalt med avspark søndag ettermiddag. Tabellen oppdateres etter hver kamp.",
    ),
    (
        "barnefotball",
        "Barnefotball",
        "https://askerfotball.no/barnefotball",
        "Barnefotballen i Asker Fotball følger NFFs retningslinjer. \
         Alle barn skal få like mye spilletid, og det føres ikke tabeller for de yngste. Nye spillere kan melde seg på via klubbens nettside.",
    ),
    (
        "gatelaget",
        "Gatelaget",
        "https://askerfotball.no/gatelaget",
        "Gatelaget er Asker Fotballs lavterskeltilbud for voksne som vil spille fotball i et trygt og inkluderende miljø. \
         Treningene er gratis og åpne for alle.",
    ),
];
