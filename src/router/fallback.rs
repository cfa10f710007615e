//! Deterministic fallback responder
//!
//! Serves a useful canned answer when every provider has failed. Pure
//! string matching over a fixed keyword table: the first matching rule in
//! table order wins, so the same prompt always yields the same answer. No
//! network, no allocation beyond the returned String.

/// Keyword table in priority order; first match wins
const FALLBACK_RULES: &[(&[&str], &str)] = &[
    (
        &["wetter", "temperatur", "regen"],
        "Aktuelle Wetterdaten für das Saarland finden Sie beim Deutschen \
Wetterdienst unter dwd.de oder in der WarnWetter-App. Das Saarland liegt in \
der gemäßigten Klimazone mit milden Wintern und warmen Sommern.",
    ),
    (
        &["amt", "behörde", "personalausweis", "verwaltung", "bürgerbüro"],
        "Für Behördengänge im Saarland nutzen Sie das Serviceportal \
service.saarland.de. Personalausweis und Reisepass beantragen Sie im \
Bürgeramt Ihrer Gemeinde; in Saarbrücken online Termin vereinbaren unter \
saarbruecken.de. Viele Anträge sind inzwischen vollständig digital möglich.",
    ),
    (
        &["tourismus", "saarschleife", "urlaub", "sehenswürdigkeit", "ausflug"],
        "Das Saarland bietet viele Ausflugsziele: die Saarschleife bei Mettlach \
mit dem Baumwipfelpfad, das UNESCO-Weltkulturerbe Völklinger Hütte und den \
Bostalsee im Nordsaarland. Informationen und Buchungen unter \
urlaub.saarland.",
    ),
    (
        &["unternehmen", "business", "gründung", "förderung", "wirtschaft"],
        "Für Unternehmensgründungen im Saarland ist die Wirtschaftsförderung \
saaris (invest-in-saarland.com) die erste Anlaufstelle. Die IHK Saarland \
berät zu Fördermitteln und Genehmigungen, das Gründungsbüro der htw saar zu \
Startups.",
    ),
    (
        &["universität", "studium", "bildung", "schule", "weiterbildung"],
        "Die Universität des Saarlandes (uni-saarland.de) in Saarbrücken ist \
bekannt für Informatik und Materialwissenschaften. Daneben bieten die htw \
saar und die HfM Saar weitere Studiengänge. Informationen zu Schulen und \
Weiterbildung unter bildung.saarland.de.",
    ),
    (
        &["kultur", "theater", "festival", "museum", "konzert"],
        "Kulturelle Highlights im Saarland: das Saarländische Staatstheater, \
das Filmfestival Max Ophüls Preis im Januar und die Museen der Stiftung \
Saarländischer Kulturbesitz. Veranstaltungskalender unter kulturort.saarland.",
    ),
];

const GENERIC_FALLBACK: &str = "Entschuldigung, unsere KI-Dienste sind im Moment \
nicht erreichbar. Bitte versuchen Sie es in wenigen Minuten erneut. Bei \
dringenden Anliegen erreichen Sie uns unter support@agentland.saarland, \
allgemeine Informationen zum Saarland finden Sie auf saarland.de.";

/// Serves deterministic answers when no provider is reachable
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackResponder;

impl FallbackResponder {
    pub fn new() -> Self {
        Self
    }

    /// Produce the canned answer for a prompt
    pub fn respond(&self, prompt: &str) -> String {
        let normalized = prompt.to_lowercase();

        for (keywords, answer) in FALLBACK_RULES {
            if keywords.iter().any(|kw| normalized.contains(kw)) {
                return (*answer).to_string();
            }
        }

        GENERIC_FALLBACK.to_string()
    }
}
