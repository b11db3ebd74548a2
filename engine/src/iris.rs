//! IRI constants for the vocabularies the engine reads and writes.

/// FAIRmodels ontology namespace.
pub const FML: &str = "https://fairmodels.org/ontology.owl#";
/// RDF namespace.
pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
/// RDFS namespace.
pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
/// XSD namespace.
pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
/// W3C PROV-O namespace.
pub const PROV: &str = "http://www.w3.org/ns/prov#";

/// `fml:Logistic_Regression` algorithm type.
pub const LOGISTIC_REGRESSION: &str = "https://fairmodels.org/ontology.owl#Logistic_Regression";
/// `fml:linear_predictor` execution type.
pub const LINEAR_PREDICTOR: &str = "https://fairmodels.org/ontology.owl#linear_predictor";
/// `fml:docker_execution` execution type (remote, containerized).
pub const DOCKER_EXECUTION: &str = "https://fairmodels.org/ontology.owl#docker_execution";

/// `rdf:type`.
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
/// `rdfs:label`.
pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";

/// `xsd:string`.
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
/// `xsd:int`.
pub const XSD_INT: &str = "http://www.w3.org/2001/XMLSchema#int";
/// `xsd:integer`.
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
/// `xsd:double`.
pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
/// `xsd:boolean`.
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
/// `xsd:dateTime`.
pub const XSD_DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fml_terms_live_in_fml_namespace() {
        for iri in [LOGISTIC_REGRESSION, LINEAR_PREDICTOR, DOCKER_EXECUTION] {
            assert!(iri.starts_with(FML), "{iri} outside {FML}");
        }
    }

    #[test]
    fn xsd_terms_live_in_xsd_namespace() {
        for iri in [XSD_STRING, XSD_INT, XSD_INTEGER, XSD_DOUBLE, XSD_BOOLEAN, XSD_DATE_TIME] {
            assert!(iri.starts_with(XSD), "{iri} outside {XSD}");
        }
    }
}
